//! Periodic survey of managed windows: which ones are gone, and how visible
//! the rest are

use std::collections::BTreeMap;
use tracing::debug;

use crate::common::constants::visibility::CORNER_INSET;
use crate::common::types::{Point, SlotId, WindowHandle};
use crate::fleet::RegistrySnapshot;
use crate::platform::WindowSystem;

/// Advisory on-screen state of a managed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Holds the input focus
    Foreground,
    /// Topmost at its center or near its top-left corner
    Exposed,
    /// Covered at both sample points
    Obscured,
    Minimized,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Visibility::Foreground => "foreground",
            Visibility::Exposed => "exposed",
            Visibility::Obscured => "obscured",
            Visibility::Minimized => "minimized",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Survey {
    /// Entries whose window disappeared; the registry owner evicts them
    pub stale: Vec<(SlotId, WindowHandle)>,
    pub visibility: BTreeMap<SlotId, Visibility>,
}

pub fn survey<W: WindowSystem + ?Sized>(windows: &W, snapshot: &RegistrySnapshot) -> Survey {
    let stale = snapshot.stale(windows);

    let foreground = windows.foreground().unwrap_or_else(|e| {
        debug!(error = %e, "Foreground query failed");
        None
    });

    let visibility = snapshot
        .iter()
        .filter(|entry| !stale.contains(entry))
        .map(|(slot, window)| (slot, classify(windows, window, foreground)))
        .collect();

    Survey { stale, visibility }
}

pub fn classify<W: WindowSystem + ?Sized>(
    windows: &W,
    window: WindowHandle,
    foreground: Option<WindowHandle>,
) -> Visibility {
    if matches!(windows.is_minimized(window), Ok(true)) {
        return Visibility::Minimized;
    }
    if foreground == Some(window) {
        return Visibility::Foreground;
    }

    let bounds = match windows.bounds(window) {
        Ok(bounds) => bounds,
        Err(e) => {
            debug!(window = %window, error = %e, "Bounds unavailable for visibility check");
            return Visibility::Obscured;
        }
    };

    let samples = [
        bounds.center(),
        Point::new(bounds.x + CORNER_INSET, bounds.y + CORNER_INSET),
    ];
    let exposed = samples
        .into_iter()
        .any(|point| matches!(windows.toplevel_at(point), Ok(Some(top)) if top == window));

    if exposed {
        Visibility::Exposed
    } else {
        Visibility::Obscured
    }
}
