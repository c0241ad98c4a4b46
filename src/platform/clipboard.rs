//! System clipboard backed by `arboard`

use anyhow::{Context, Result, anyhow};
use std::sync::Mutex;
use tracing::debug;

use super::Clipboard;

/// Lazily opened clipboard handle.
///
/// On X11 the selection is served by arboard's background thread only while a
/// handle is alive, so the handle is kept for the life of the platform.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("Clipboard lock poisoned"))?;

        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new().context("Failed to open system clipboard")?);
        }

        let Some(clipboard) = guard.as_mut() else {
            return Err(anyhow!("Clipboard unavailable"));
        };

        if let Err(e) = clipboard.set_text(text.to_owned()) {
            // Drop the handle so the next attempt reopens it
            *guard = None;
            return Err(anyhow!(e)).context("Failed to set clipboard text");
        }

        debug!(len = text.len(), "Clipboard staged");
        Ok(())
    }
}
