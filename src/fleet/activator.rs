//! Raise, focus and placement of a single window
//!
//! Every operation degrades to `false` on failure and logs why; nothing here
//! returns an error to the caller.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::common::constants::layout::PLACEMENT_TOLERANCE;
use crate::common::types::{Key, Rect, WindowHandle};
use crate::config::{Timings, pause};
use crate::platform::Platform;

#[derive(Clone)]
pub struct WindowActivator {
    platform: Arc<dyn Platform>,
    timings: Timings,
    unlock_key: Option<Key>,
}

impl WindowActivator {
    pub fn new(platform: Arc<dyn Platform>, timings: Timings, unlock_key: Option<Key>) -> Self {
        Self {
            platform,
            timings,
            unlock_key,
        }
    }

    /// Restore, place at `rect` (one verified retry), then raise with focus
    pub fn activate_and_move(&self, window: WindowHandle, rect: Rect) -> bool {
        if !self.platform.is_valid(window) {
            debug!(window = %window, "Window gone before placement");
            return false;
        }

        self.restore_if_minimized(window);

        if let Err(e) = self.platform.move_resize(window, rect) {
            warn!(window = %window, target = %rect, error = %e, "Failed to move window");
            return false;
        }
        pause(self.timings.move_settle());

        match self.platform.bounds(window) {
            Ok(actual) if !actual.origin_within(&rect, PLACEMENT_TOLERANCE) => {
                debug!(window = %window, target = %rect, actual = %actual, "Window drifted, retrying move");
                if let Err(e) = self.platform.move_resize(window, rect) {
                    debug!(window = %window, error = %e, "Retry move failed");
                }
            }
            Ok(_) => {}
            Err(e) => debug!(window = %window, error = %e, "Could not verify placement"),
        }

        self.bring_to_front(window, true)
    }

    /// Raise a window, restoring it first if minimized; with `focus` it is also
    /// activated and stray modifiers are released
    pub fn bring_to_front(&self, window: WindowHandle, focus: bool) -> bool {
        self.restore_if_minimized(window);

        if !focus {
            return match self.platform.raise(window) {
                Ok(()) => true,
                Err(e) => {
                    debug!(window = %window, error = %e, "Failed to raise window");
                    false
                }
            };
        }

        if let Some(key) = self.unlock_key
            && let Err(e) = self.platform.key(key, true)
        {
            debug!(key = %key, error = %e, "Failed to press focus unlock key");
        }

        let activated = self.platform.raise_with_focus(window);

        if let Some(key) = self.unlock_key
            && let Err(e) = self.platform.key(key, false)
        {
            debug!(key = %key, error = %e, "Failed to release focus unlock key");
        }

        if let Err(e) = self.platform.show(window) {
            debug!(window = %window, error = %e, "Failed to show window");
        }

        self.release_modifiers();

        match activated {
            Ok(()) => true,
            Err(e) => {
                debug!(window = %window, error = %e, "Activation request failed");
                false
            }
        }
    }

    fn restore_if_minimized(&self, window: WindowHandle) {
        match self.platform.is_minimized(window) {
            Ok(true) => {
                if let Err(e) = self.platform.restore(window) {
                    debug!(window = %window, error = %e, "Failed to restore window");
                }
            }
            Ok(false) => {}
            Err(e) => debug!(window = %window, error = %e, "Minimized check failed"),
        }
    }

    /// Release every modifier and wait until none is logically held
    pub fn release_modifiers(&self) -> bool {
        for key in Key::MODIFIERS {
            if let Err(e) = self.platform.key(key, false) {
                debug!(key = %key, error = %e, "Failed to release modifier");
            }
        }

        let deadline = Instant::now() + self.timings.modifier_release_timeout();
        loop {
            let held: Vec<Key> = Key::MODIFIERS
                .into_iter()
                .filter(|&key| self.platform.is_key_down(key).unwrap_or(false))
                .collect();
            if held.is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                debug!(held = ?held, "Modifiers still held after release");
                return false;
            }
            pause(self.timings.modifier_poll());
        }
    }

    /// Focused raise of every window, staggered
    pub fn activate_all(&self, windows: &[WindowHandle]) -> usize {
        let mut raised = 0;
        for (idx, &window) in windows.iter().enumerate() {
            if idx > 0 {
                pause(self.timings.activate_all_stagger());
            }
            if self.platform.is_valid(window) && self.bring_to_front(window, true) {
                raised += 1;
            }
        }
        raised
    }

    pub fn minimize(&self, window: WindowHandle) -> bool {
        match self.platform.minimize(window) {
            Ok(()) => true,
            Err(e) => {
                debug!(window = %window, error = %e, "Failed to minimize window");
                false
            }
        }
    }

    pub fn close(&self, window: WindowHandle) -> bool {
        match self.platform.close(window) {
            Ok(()) => true,
            Err(e) => {
                debug!(window = %window, error = %e, "Failed to close window");
                false
            }
        }
    }
}
