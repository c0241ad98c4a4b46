//! Browser process spawning and process-name lookup

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::ProcessLauncher;
use crate::common::constants::paths;
use crate::config::BrowserSettings;
use crate::fleet::launch::LaunchRequest;

/// Starts one browser instance per slot with that slot's profile
pub struct BrowserLauncher {
    settings: BrowserSettings,
}

impl BrowserLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }
}

impl ProcessLauncher for BrowserLauncher {
    fn spawn_instance(&self, request: &LaunchRequest) -> Result<()> {
        let args = self.settings.args_for(request.slot);
        debug!(slot = %request.slot, executable = %self.settings.executable, args = ?args, "Spawning browser instance");

        // The fleet only tracks the window; the child is reaped in the background
        let mut child = Command::new(&self.settings.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to spawn '{}' for slot {}",
                    self.settings.executable, request.slot
                )
            })?;

        info!(slot = %request.slot, pid = child.id(), "Browser instance started");
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                debug!(error = %e, "Failed to reap browser process");
            }
        });
        Ok(())
    }
}

/// Short process name of `pid` as reported by /proc/<pid>/comm
pub fn process_name(pid: u32) -> Result<String> {
    let path: PathBuf = [paths::PROC_DIR, &pid.to_string(), "comm"].iter().collect();
    let name = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(name.trim().to_string())
}
