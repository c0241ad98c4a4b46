//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// X11 protocol constants
pub mod x11 {
    /// Source indication for _NET_ACTIVE_WINDOW (2 = pager/direct user action)
    pub const ACTIVE_WINDOW_SOURCE_PAGER: u32 = 2;

    /// _NET_WM_STATE action: remove/unset property (0)
    pub const NET_WM_STATE_REMOVE: u32 = 0;

    /// _NET_WM_STATE action: add/set property (1)
    pub const NET_WM_STATE_ADD: u32 = 1;

    /// WM_CHANGE_STATE iconic value (requests the WM to minimize)
    pub const ICONIC_STATE: u32 = 3;

    /// Size of PID property value in bytes
    pub const PID_PROPERTY_SIZE: usize = 4;
}

/// X11 keysym values for the keys the fleet injects or watches
pub mod keysym {
    pub const CONTROL_L: u32 = 0xffe3;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const ALT_L: u32 = 0xffe9;
    pub const SUPER_L: u32 = 0xffeb;
    pub const RETURN: u32 = 0xff0d;
    pub const ESCAPE: u32 = 0xff1b;
    pub const TAB: u32 = 0xff09;
    /// F1; F2..F12 follow contiguously
    pub const F1: u32 = 0xffbe;
}

/// Mouse button constants
pub mod mouse {
    /// Left mouse button number
    pub const BUTTON_LEFT: u8 = 1;
}

/// Slot identity bounds
pub mod slots {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;
}

/// Grid layout constants; cell sizes and offsets match the established
/// placement formula, so existing slot positions do not move
pub mod layout {
    /// Cells per row on one display
    pub const COLUMNS: u32 = 4;

    /// Display width divided by this gives the cell width
    pub const WIDTH_DIVISOR: f64 = 3.6;

    /// Display height divided by this gives the cell height
    pub const HEIGHT_DIVISOR: i32 = 2;

    /// Number of column gaps the remaining width is split into
    pub const GAP_DIVISOR: f64 = 3.0;

    /// Number of distinct cells on one display; later slots recycle them
    pub const CELLS_PER_DISPLAY: u32 = 8;

    /// Maximum origin drift in pixels before a move is retried
    pub const PLACEMENT_TOLERANCE: i32 = 5;
}

/// Advisory visibility sampling
pub mod visibility {
    /// Inset from the window's top-left corner for the second sample point
    pub const CORNER_INSET: i32 = 15;
}

/// Browser defaults (Microsoft Edge on Linux)
pub mod browser {
    pub const EXECUTABLE: &str = "microsoft-edge";

    /// WM_CLASS class component of Edge top-level windows
    pub const WINDOW_CLASS: &str = "Microsoft-edge";

    /// /proc/<pid>/comm of the browser process
    pub const PROCESS_NAME: &str = "msedge";

    /// Per-slot profile argument; `{slot}` is substituted
    pub const PROFILE_ARG: &str = "--profile-directory=Profile {slot}";

    /// Placeholder substituted in `PROFILE_ARG`
    pub const SLOT_PLACEHOLDER: &str = "{slot}";

    pub const LAUNCH_ARGS: &[&str] = &[
        "--new-window",
        "--no-first-run",
        "--no-default-browser-check",
    ];
}

/// System paths
pub mod paths {
    /// Directory holding per-process information
    pub const PROC_DIR: &str = "/proc";
}

/// Configuration paths and filenames
pub mod config {
    /// Application directory name under XDG config
    pub const APP_DIR: &str = "browser-fleet";

    /// Configuration filename
    pub const FILENAME: &str = "config.json";
}

/// Default configuration values
/// These are used when creating a new config or filling missing fields
pub mod defaults {
    /// Capture hotkeys
    pub mod capture {
        pub const ARM_KEY: &str = "f8";
        pub const CANCEL_KEY: &str = "escape";

        /// Minimum spacing between two accepted arm presses
        pub const DEBOUNCE_MS: u64 = 300;

        /// Key-state sampling period of the watcher thread
        pub const POLL_INTERVAL_MS: u64 = 20;
    }

    /// Neutral modifier tapped around focus requests
    pub const FOCUS_UNLOCK_KEY: &str = "alt";

    /// Settle delays and deadlines, in milliseconds
    pub mod timing {
        /// Pause between a move and re-reading the bounds
        pub const MOVE_SETTLE_MS: u64 = 50;

        /// Budget for lingering modifiers to clear after a focused raise
        pub const MODIFIER_RELEASE_TIMEOUT_MS: u64 = 500;
        pub const MODIFIER_POLL_MS: u64 = 25;

        /// Launch matching
        pub const LAUNCH_POLL_MS: u64 = 300;
        pub const LAUNCH_DEADLINE_MS: u64 = 40_000;

        /// Broadcast pacing
        pub const FIRST_WINDOW_SETTLE_MS: u64 = 500;
        pub const WINDOW_SETTLE_MS: u64 = 200;
        pub const KEY_HOLD_MS: u64 = 50;
        pub const NEW_TAB_SETTLE_MS: u64 = 300;
        pub const ADDRESS_BAR_SETTLE_MS: u64 = 200;
        pub const PASTE_SETTLE_MS: u64 = 150;
        pub const DEVTOOLS_SETTLE_MS: u64 = 800;
        pub const AFTER_WINDOW_MS: u64 = 100;

        /// Focus confirmation before typing
        pub const FOCUS_CONFIRM_TIMEOUT_MS: u64 = 2_500;
        pub const FOCUS_CONFIRM_ATTEMPTS: u32 = 3;
        pub const FOCUS_POLL_MS: u64 = 50;

        /// Clipboard staging
        pub const CLIPBOARD_ATTEMPTS: u32 = 3;
        pub const CLIPBOARD_RETRY_MS: u64 = 100;

        /// Pause between windows when raising the whole fleet
        pub const ACTIVATE_ALL_STAGGER_MS: u64 = 50;

        /// Registry reconciliation tick
        pub const RECONCILE_TICK_MS: u64 = 400;
    }
}
