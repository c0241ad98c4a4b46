//! Fleet configuration with JSON persistence
//!
//! Every field carries a serde default so config files written by older
//! versions keep loading after new settings are added.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::timings::Timings;
use crate::common::constants::{browser, config, defaults};
use crate::common::types::{Key, SlotId};

/// How to start and recognise the controlled browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserSettings {
    #[serde(default = "default_executable")]
    pub executable: String,

    /// WM_CLASS class component identifying browser top-level windows
    #[serde(default = "default_window_class")]
    pub window_class: String,

    /// Name of the owning process (/proc/<pid>/comm, case-insensitive substring)
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Profile selector argument; `{slot}` is replaced with the slot number
    #[serde(default = "default_profile_arg")]
    pub profile_arg: String,

    /// Fixed flags that suppress first-run and default-browser prompts
    #[serde(default = "default_launch_args")]
    pub launch_args: Vec<String>,
}

impl BrowserSettings {
    /// Full argument list for one slot's instance
    pub fn args_for(&self, slot: SlotId) -> Vec<String> {
        let mut args = vec![
            self.profile_arg
                .replace(browser::SLOT_PLACEHOLDER, &slot.to_string()),
        ];
        args.extend(self.launch_args.iter().cloned());
        args
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            window_class: default_window_class(),
            process_name: default_process_name(),
            profile_arg: default_profile_arg(),
            launch_args: default_launch_args(),
        }
    }
}

/// Hotkeys of the click capture bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureSettings {
    #[serde(default = "default_arm_key")]
    pub arm_key: Key,

    #[serde(default = "default_cancel_key")]
    pub cancel_key: Key,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_capture_poll_ms")]
    pub poll_interval_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            arm_key: default_arm_key(),
            cancel_key: default_cancel_key(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_capture_poll_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FleetConfig {
    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub capture: CaptureSettings,

    /// Neutral modifier tapped around focus requests; `null` disables the tap
    #[serde(default = "default_focus_unlock_key")]
    pub focus_unlock_key: Option<Key>,

    #[serde(default)]
    pub timings: Timings,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            capture: CaptureSettings::default(),
            focus_unlock_key: default_focus_unlock_key(),
            timings: Timings::default(),
        }
    }
}

fn default_executable() -> String {
    browser::EXECUTABLE.to_string()
}

fn default_window_class() -> String {
    browser::WINDOW_CLASS.to_string()
}

fn default_process_name() -> String {
    browser::PROCESS_NAME.to_string()
}

fn default_profile_arg() -> String {
    browser::PROFILE_ARG.to_string()
}

fn default_launch_args() -> Vec<String> {
    browser::LAUNCH_ARGS.iter().map(|s| s.to_string()).collect()
}

fn default_arm_key() -> Key {
    defaults::capture::ARM_KEY.parse().unwrap_or(Key::Function(8))
}

fn default_cancel_key() -> Key {
    defaults::capture::CANCEL_KEY.parse().unwrap_or(Key::Escape)
}

fn default_debounce_ms() -> u64 {
    defaults::capture::DEBOUNCE_MS
}

fn default_capture_poll_ms() -> u64 {
    defaults::capture::POLL_INTERVAL_MS
}

fn default_focus_unlock_key() -> Option<Key> {
    defaults::FOCUS_UNLOCK_KEY.parse().ok()
}

impl FleetConfig {
    /// Default location under the XDG config directory
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load from `path`, writing defaults out when the file does not exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, writing defaults");
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file at {:?}", path))?;

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let json_string =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        fs::write(path, json_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }
}
