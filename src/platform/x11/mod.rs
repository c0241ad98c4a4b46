//! X11 backend for the fleet core
//!
//! Window control goes through EWMH client messages, synthetic keys through
//! XTEST, displays through RandR. Browser windows are recognised by WM_CLASS
//! plus the owning process name.

mod context;
mod control;
mod displays;
mod input;
mod query;

pub use context::{CachedAtoms, KeycodeMap};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, KeyButMask, Screen, Window};
use x11rb::rust_connection::RustConnection;

use super::{
    BrowserLauncher, Clipboard, DisplaySource, InputInjector, KeyState, ProcessLauncher,
    SystemClipboard, WindowSystem, process_name,
};
use crate::common::types::{DisplayInfo, Key, Point, Rect, WindowHandle};
use crate::config::FleetConfig;
use crate::fleet::launch::LaunchRequest;

pub struct X11Platform {
    conn: RustConnection,
    screen: Screen,
    atoms: CachedAtoms,
    keycodes: KeycodeMap,
    launcher: BrowserLauncher,
    clipboard: SystemClipboard,
}

impl X11Platform {
    pub fn connect(config: &FleetConfig) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11 server")?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .cloned()
            .ok_or_else(|| anyhow!("X11 screen {} not found", screen_num))?;

        let atoms = CachedAtoms::new(&conn)?;
        let keycodes = KeycodeMap::load(&conn)?;

        info!(
            screen = screen_num,
            width = screen.width_in_pixels,
            height = screen.height_in_pixels,
            "Connected to X11 display"
        );

        Ok(Self {
            conn,
            screen,
            atoms,
            keycodes,
            launcher: BrowserLauncher::new(config.browser.clone()),
            clipboard: SystemClipboard::new(),
        })
    }

    fn root(&self) -> Window {
        self.screen.root
    }

    /// Browser top-level: WM_CLASS matches and the owning process has the browser's name
    fn is_browser_window(&self, window: Window) -> bool {
        let settings = self.launcher.settings();

        let class = match query::get_window_class(&self.conn, window) {
            Ok(Some(class)) => class,
            Ok(None) => return false,
            Err(e) => {
                debug!(window = window, error = %e, "WM_CLASS lookup failed");
                return false;
            }
        };
        if !class.eq_ignore_ascii_case(&settings.window_class) {
            return false;
        }

        let pid = match query::get_window_pid(&self.conn, window, &self.atoms) {
            Ok(Some(pid)) => pid,
            Ok(None) => {
                debug!(window = window, "Browser-class window without _NET_WM_PID, ignoring");
                return false;
            }
            Err(e) => {
                debug!(window = window, error = %e, "_NET_WM_PID lookup failed");
                return false;
            }
        };

        match process_name(pid) {
            Ok(name) => name
                .to_lowercase()
                .contains(&settings.process_name.to_lowercase()),
            Err(e) => {
                debug!(window = window, pid = pid, error = %e, "Process lookup failed");
                false
            }
        }
    }

    fn keycode_for(&self, key: Key) -> Result<u8> {
        self.keycodes
            .keycode(key.keysym())
            .ok_or_else(|| anyhow!("Key '{}' is not on the current keyboard map", key))
    }

    fn translate(&self, src: Window, dst: Window, point: Point) -> Result<Point> {
        let (x, y) = point.to_i16();
        let reply = self
            .conn
            .translate_coordinates(src, dst, x, y)
            .context("Failed to translate coordinates")?
            .reply()
            .context("Failed to get translate coordinates reply")?;
        Ok(Point::new(i32::from(reply.dst_x), i32::from(reply.dst_y)))
    }
}

impl DisplaySource for X11Platform {
    fn displays(&self) -> Result<Vec<DisplayInfo>> {
        displays::query_displays(&self.conn, &self.screen)
    }
}

impl WindowSystem for X11Platform {
    fn app_windows(&self) -> Result<Vec<WindowHandle>> {
        let clients = query::get_client_list(&self.conn, self.root(), &self.atoms)?;
        Ok(clients
            .into_iter()
            .map(WindowHandle)
            .filter(|&w| self.is_valid(w) && self.is_browser_window(w.raw()))
            .collect())
    }

    /// Iconified windows are unmapped on X11 but still count as present
    fn is_valid(&self, window: WindowHandle) -> bool {
        query::is_window_viewable(&self.conn, window.raw())
            || matches!(
                query::is_window_minimized(&self.conn, window.raw(), &self.atoms),
                Ok(true)
            )
    }

    fn is_minimized(&self, window: WindowHandle) -> Result<bool> {
        query::is_window_minimized(&self.conn, window.raw(), &self.atoms)
    }

    fn restore(&self, window: WindowHandle) -> Result<()> {
        control::restore_window(&self.conn, self.root(), &self.atoms, window.raw())
    }

    fn move_resize(&self, window: WindowHandle, rect: Rect) -> Result<()> {
        control::move_resize_window(&self.conn, window.raw(), rect)
    }

    fn bounds(&self, window: WindowHandle) -> Result<Rect> {
        query::get_window_bounds(&self.conn, self.root(), window.raw())
    }

    fn raise(&self, window: WindowHandle) -> Result<()> {
        control::raise_window(&self.conn, window.raw())
    }

    fn raise_with_focus(&self, window: WindowHandle) -> Result<()> {
        control::activate_window(&self.conn, self.root(), &self.atoms, window.raw())
    }

    fn show(&self, window: WindowHandle) -> Result<()> {
        control::show_window(&self.conn, window.raw())
    }

    fn foreground(&self) -> Result<Option<WindowHandle>> {
        Ok(query::get_active_window(&self.conn, self.root(), &self.atoms)?.map(WindowHandle))
    }

    fn toplevel_at(&self, point: Point) -> Result<Option<WindowHandle>> {
        let (x, y) = point.to_i16();
        let Some(frame) = input::root_child_at(&self.conn, self.root(), x, y)? else {
            return Ok(None);
        };

        // Map the frame back to the client window the registry knows about
        for client in query::get_client_list(&self.conn, self.root(), &self.atoms)? {
            match query::get_root_ancestor(&self.conn, self.root(), client) {
                Ok(ancestor) if ancestor == frame => return Ok(Some(WindowHandle(client))),
                Ok(_) => {}
                Err(e) => debug!(window = client, error = %e, "Ancestor lookup failed"),
            }
        }
        Ok(Some(WindowHandle(frame)))
    }

    fn screen_to_client(&self, window: WindowHandle, point: Point) -> Result<Point> {
        self.translate(self.root(), window.raw(), point)
    }

    fn close(&self, window: WindowHandle) -> Result<()> {
        control::close_window(&self.conn, &self.atoms, window.raw())
    }

    fn minimize(&self, window: WindowHandle) -> Result<()> {
        control::minimize_window(&self.conn, self.root(), &self.atoms, window.raw())
    }
}

impl ProcessLauncher for X11Platform {
    fn spawn_instance(&self, request: &LaunchRequest) -> Result<()> {
        self.launcher.spawn_instance(request)
    }
}

impl KeyState for X11Platform {
    fn is_key_down(&self, key: Key) -> Result<bool> {
        let keycode = self.keycode_for(key)?;
        input::is_keycode_down(&self.conn, keycode)
    }

    fn is_left_button_down(&self) -> Result<bool> {
        let (_, _, mask) = input::query_pointer_state(&self.conn, self.root())?;
        Ok(mask.contains(KeyButMask::BUTTON1))
    }

    fn cursor_position(&self) -> Result<Point> {
        let (x, y, _) = input::query_pointer_state(&self.conn, self.root())?;
        Ok(Point::new(i32::from(x), i32::from(y)))
    }
}

impl Clipboard for X11Platform {
    fn set_text(&self, text: &str) -> Result<()> {
        self.clipboard.set_text(text)
    }
}

impl InputInjector for X11Platform {
    fn key(&self, key: Key, pressed: bool) -> Result<()> {
        let keycode = self.keycode_for(key)?;
        input::fake_key(&self.conn, self.root(), keycode, pressed)
    }

    fn post_click(&self, window: WindowHandle, point: Point) -> Result<()> {
        let screen_point = self.translate(window.raw(), self.root(), point)?;
        control::post_button_click(&self.conn, self.root(), window.raw(), point, screen_point)
    }
}
