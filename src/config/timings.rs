//! Settle delays, poll intervals and deadlines
//!
//! Stored as plain millisecond counts in the config file; the fleet core reads
//! them through the `Duration` accessors.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::constants::defaults::timing;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    pub move_settle_ms: u64,
    pub modifier_release_timeout_ms: u64,
    pub modifier_poll_ms: u64,
    pub launch_poll_ms: u64,
    pub launch_deadline_ms: u64,
    pub first_window_settle_ms: u64,
    pub window_settle_ms: u64,
    pub key_hold_ms: u64,
    pub new_tab_settle_ms: u64,
    pub address_bar_settle_ms: u64,
    pub paste_settle_ms: u64,
    pub devtools_settle_ms: u64,
    pub after_window_ms: u64,
    pub focus_confirm_timeout_ms: u64,
    pub focus_confirm_attempts: u32,
    pub focus_poll_ms: u64,
    pub clipboard_attempts: u32,
    pub clipboard_retry_ms: u64,
    pub activate_all_stagger_ms: u64,
    pub reconcile_tick_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            move_settle_ms: timing::MOVE_SETTLE_MS,
            modifier_release_timeout_ms: timing::MODIFIER_RELEASE_TIMEOUT_MS,
            modifier_poll_ms: timing::MODIFIER_POLL_MS,
            launch_poll_ms: timing::LAUNCH_POLL_MS,
            launch_deadline_ms: timing::LAUNCH_DEADLINE_MS,
            first_window_settle_ms: timing::FIRST_WINDOW_SETTLE_MS,
            window_settle_ms: timing::WINDOW_SETTLE_MS,
            key_hold_ms: timing::KEY_HOLD_MS,
            new_tab_settle_ms: timing::NEW_TAB_SETTLE_MS,
            address_bar_settle_ms: timing::ADDRESS_BAR_SETTLE_MS,
            paste_settle_ms: timing::PASTE_SETTLE_MS,
            devtools_settle_ms: timing::DEVTOOLS_SETTLE_MS,
            after_window_ms: timing::AFTER_WINDOW_MS,
            focus_confirm_timeout_ms: timing::FOCUS_CONFIRM_TIMEOUT_MS,
            focus_confirm_attempts: timing::FOCUS_CONFIRM_ATTEMPTS,
            focus_poll_ms: timing::FOCUS_POLL_MS,
            clipboard_attempts: timing::CLIPBOARD_ATTEMPTS,
            clipboard_retry_ms: timing::CLIPBOARD_RETRY_MS,
            activate_all_stagger_ms: timing::ACTIVATE_ALL_STAGGER_MS,
            reconcile_tick_ms: timing::RECONCILE_TICK_MS,
        }
    }
}

impl Timings {
    /// No pacing at all; deadlines shrink to a few milliseconds.
    /// Used by tests driving the core against a scripted platform.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            move_settle_ms: 0,
            modifier_release_timeout_ms: 5,
            modifier_poll_ms: 1,
            launch_poll_ms: 1,
            launch_deadline_ms: 500,
            first_window_settle_ms: 0,
            window_settle_ms: 0,
            key_hold_ms: 0,
            new_tab_settle_ms: 0,
            address_bar_settle_ms: 0,
            paste_settle_ms: 0,
            devtools_settle_ms: 0,
            after_window_ms: 0,
            focus_confirm_timeout_ms: 5,
            focus_confirm_attempts: 3,
            focus_poll_ms: 1,
            clipboard_attempts: 3,
            clipboard_retry_ms: 0,
            activate_all_stagger_ms: 0,
            reconcile_tick_ms: 400,
        }
    }

    pub fn move_settle(&self) -> Duration {
        Duration::from_millis(self.move_settle_ms)
    }

    pub fn modifier_release_timeout(&self) -> Duration {
        Duration::from_millis(self.modifier_release_timeout_ms)
    }

    pub fn modifier_poll(&self) -> Duration {
        Duration::from_millis(self.modifier_poll_ms)
    }

    pub fn launch_poll(&self) -> Duration {
        Duration::from_millis(self.launch_poll_ms)
    }

    pub fn launch_deadline(&self) -> Duration {
        Duration::from_millis(self.launch_deadline_ms)
    }

    /// Settle after raising a window; the first window of a batch gets longer
    pub fn window_settle(&self, first: bool) -> Duration {
        Duration::from_millis(if first {
            self.first_window_settle_ms
        } else {
            self.window_settle_ms
        })
    }

    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    pub fn new_tab_settle(&self) -> Duration {
        Duration::from_millis(self.new_tab_settle_ms)
    }

    pub fn address_bar_settle(&self) -> Duration {
        Duration::from_millis(self.address_bar_settle_ms)
    }

    pub fn paste_settle(&self) -> Duration {
        Duration::from_millis(self.paste_settle_ms)
    }

    pub fn devtools_settle(&self) -> Duration {
        Duration::from_millis(self.devtools_settle_ms)
    }

    pub fn after_window(&self) -> Duration {
        Duration::from_millis(self.after_window_ms)
    }

    pub fn focus_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.focus_confirm_timeout_ms)
    }

    pub fn focus_poll(&self) -> Duration {
        Duration::from_millis(self.focus_poll_ms)
    }

    pub fn clipboard_retry(&self) -> Duration {
        Duration::from_millis(self.clipboard_retry_ms)
    }

    pub fn activate_all_stagger(&self) -> Duration {
        Duration::from_millis(self.activate_all_stagger_ms)
    }

    pub fn reconcile_tick(&self) -> Duration {
        Duration::from_millis(self.reconcile_tick_ms.max(1))
    }
}

/// Sleep unless the duration is zero
pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
