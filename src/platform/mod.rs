//! OS accessors consumed by the fleet core
//!
//! The core never talks to the display server directly. Everything it needs
//! (window enumeration and control, displays, process spawn, key state, the
//! clipboard and synthetic input) goes through these traits. The X11 backend
//! implements all of them; tests use a scripted fake.

use anyhow::Result;

use crate::common::types::{DisplayInfo, Key, Point, Rect, WindowHandle};
use crate::fleet::launch::LaunchRequest;

mod clipboard;
mod process;
pub mod x11;

#[cfg(test)]
pub mod fake;

pub use clipboard::SystemClipboard;
pub use process::{BrowserLauncher, process_name};
pub use x11::X11Platform;

/// Display enumeration
pub trait DisplaySource {
    fn displays(&self) -> Result<Vec<DisplayInfo>>;
}

/// Top-level window enumeration and control
pub trait WindowSystem {
    /// Visible top-level windows of the controlled application, in the
    /// window manager's creation order
    fn app_windows(&self) -> Result<Vec<WindowHandle>>;

    /// Window still exists and is mapped/visible
    fn is_valid(&self, window: WindowHandle) -> bool;

    fn is_minimized(&self, window: WindowHandle) -> Result<bool>;

    fn restore(&self, window: WindowHandle) -> Result<()>;

    fn move_resize(&self, window: WindowHandle, rect: Rect) -> Result<()>;

    /// Current bounds in screen coordinates
    fn bounds(&self, window: WindowHandle) -> Result<Rect>;

    /// Raise to the top of the stacking order without activating
    fn raise(&self, window: WindowHandle) -> Result<()>;

    /// Ask the window manager to activate (focus) the window
    fn raise_with_focus(&self, window: WindowHandle) -> Result<()>;

    /// Force the window visible (mapped)
    fn show(&self, window: WindowHandle) -> Result<()>;

    /// Window that currently holds the input focus, if any
    fn foreground(&self) -> Result<Option<WindowHandle>>;

    /// Top-level window under a screen point (point-to-window, then root ancestor)
    fn toplevel_at(&self, point: Point) -> Result<Option<WindowHandle>>;

    fn screen_to_client(&self, window: WindowHandle, point: Point) -> Result<Point>;

    /// Politely request the window to close
    fn close(&self, window: WindowHandle) -> Result<()>;

    fn minimize(&self, window: WindowHandle) -> Result<()>;
}

/// Starts browser instances
pub trait ProcessLauncher {
    fn spawn_instance(&self, request: &LaunchRequest) -> Result<()>;
}

/// Instantaneous global input state, independent of focus
pub trait KeyState {
    fn is_key_down(&self, key: Key) -> Result<bool>;

    fn is_left_button_down(&self) -> Result<bool>;

    fn cursor_position(&self) -> Result<Point>;
}

/// Shared system clipboard
pub trait Clipboard {
    fn set_text(&self, text: &str) -> Result<()>;
}

/// Synthetic input injection
pub trait InputInjector {
    /// Global key press/release, delivered to whatever has focus
    fn key(&self, key: Key, pressed: bool) -> Result<()>;

    /// Left button down/up delivered directly to `window` at client coordinates
    fn post_click(&self, window: WindowHandle, point: Point) -> Result<()>;
}

/// Everything the fleet core needs from the OS
pub trait Platform:
    DisplaySource + WindowSystem + ProcessLauncher + KeyState + Clipboard + InputInjector + Send + Sync
{
}

impl<T> Platform for T where
    T: DisplaySource
        + WindowSystem
        + ProcessLauncher
        + KeyState
        + Clipboard
        + InputInjector
        + Send
        + Sync
{
}
