//! X11 window state queries

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use super::CachedAtoms;
use crate::common::constants::x11;
use crate::common::types::Rect;

/// Get the WM_CLASS property of a window (returns the second string, which is the class name)
pub fn get_window_class(conn: &RustConnection, window: Window) -> Result<Option<String>> {
    let cookie = conn
        .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)
        .context(format!("Failed to query WM_CLASS property for window {}", window))?;

    let prop = match cookie.reply() {
        Ok(reply) => reply,
        Err(ReplyError::X11Error(err)) if err.error_kind == x11rb::protocol::ErrorKind::Window => {
            debug!(window = window, "Window destroyed before WM_CLASS reply, skipping");
            return Ok(None);
        }
        Err(err) => {
            return Err(err).context(format!("Failed to get WM_CLASS reply for window {}", window));
        }
    };

    Ok(parse_wm_class(&prop.value))
}

/// WM_CLASS holds two null-terminated strings: <instance>\0<class>\0
pub fn parse_wm_class(value: &[u8]) -> Option<String> {
    if value.is_empty() {
        return None;
    }

    let parts: Vec<&[u8]> = value.split(|&b| b == 0).collect();
    let class_bytes = if parts.len() >= 2 && !parts[1].is_empty() {
        parts[1]
    } else {
        parts[0]
    };

    Some(String::from_utf8_lossy(class_bytes).into_owned())
}

/// Owning process id from _NET_WM_PID, if the client set it
pub fn get_window_pid(
    conn: &RustConnection,
    window: Window,
    atoms: &CachedAtoms,
) -> Result<Option<u32>> {
    let cookie = conn
        .get_property(false, window, atoms.net_wm_pid, AtomEnum::CARDINAL, 0, 1)
        .context(format!("Failed to query _NET_WM_PID for window {}", window))?;

    match cookie.reply() {
        Ok(reply) if reply.value.len() >= x11::PID_PROPERTY_SIZE => {
            Ok(reply.value32().and_then(|mut values| values.next()))
        }
        Ok(_) => Ok(None),
        Err(ReplyError::X11Error(err)) if err.error_kind == x11rb::protocol::ErrorKind::Window => {
            debug!(window = window, "Window destroyed before _NET_WM_PID reply");
            Ok(None)
        }
        Err(err) => Err(err).context(format!("Failed to get _NET_WM_PID reply for window {}", window)),
    }
}

/// True if the window exists and is mapped and viewable
pub fn is_window_viewable(conn: &RustConnection, window: Window) -> bool {
    let Ok(cookie) = conn.get_window_attributes(window) else {
        return false;
    };
    match cookie.reply() {
        Ok(attrs) => attrs.map_state == MapState::VIEWABLE,
        Err(_) => false,
    }
}

/// Check whether the given window is currently minimized/iconified
pub fn is_window_minimized(
    conn: &RustConnection,
    window: Window,
    atoms: &CachedAtoms,
) -> Result<bool> {
    let net_state_cookie = conn
        .get_property(false, window, atoms.net_wm_state, AtomEnum::ATOM, 0, 1024)
        .context(format!("Failed to query _NET_WM_STATE for window {}", window))?;
    match net_state_cookie.reply() {
        Ok(reply) => {
            if let Some(mut values) = reply.value32()
                && values.any(|state| state == atoms.net_wm_state_hidden)
            {
                return Ok(true);
            }
        }
        Err(ReplyError::X11Error(err)) if err.error_kind == x11rb::protocol::ErrorKind::Window => {
            debug!(window = window, "Window destroyed before _NET_WM_STATE reply");
            return Ok(false);
        }
        Err(err) => {
            return Err(err)
                .context(format!("Failed to get _NET_WM_STATE reply for window {}", window));
        }
    }

    // Fallback to ICCCM WM_STATE / IconicState detection
    let wm_state_cookie = conn
        .get_property(false, window, atoms.wm_state, atoms.wm_state, 0, 2)
        .context(format!("Failed to query WM_STATE for window {}", window))?;
    match wm_state_cookie.reply() {
        Ok(reply) => {
            if let Some(mut values) = reply.value32()
                && let Some(state) = values.next()
                && state == x11::ICONIC_STATE
            {
                return Ok(true);
            }
        }
        Err(ReplyError::X11Error(err)) if err.error_kind == x11rb::protocol::ErrorKind::Window => {
            debug!(window = window, "Window destroyed before WM_STATE reply");
            return Ok(false);
        }
        Err(err) => {
            return Err(err).context(format!("Failed to get WM_STATE reply for window {}", window));
        }
    }

    Ok(false)
}

/// Get the currently focused window ID, if any
pub fn get_active_window(
    conn: &RustConnection,
    root: Window,
    atoms: &CachedAtoms,
) -> Result<Option<Window>> {
    let active_window_prop = conn
        .get_property(false, root, atoms.net_active_window, AtomEnum::WINDOW, 0, 1)
        .context("Failed to query _NET_ACTIVE_WINDOW property")?
        .reply()
        .context("Failed to get reply for _NET_ACTIVE_WINDOW query")?;

    Ok(active_window_prop
        .value32()
        .and_then(|mut values| values.next())
        .filter(|&window| window != x11rb::NONE))
}

/// Get the list of client windows from _NET_CLIENT_LIST property on root window
pub fn get_client_list(
    conn: &RustConnection,
    root: Window,
    atoms: &CachedAtoms,
) -> Result<Vec<Window>> {
    let prop = conn
        .get_property(false, root, atoms.net_client_list, AtomEnum::WINDOW, 0, u32::MAX)
        .context("Failed to query _NET_CLIENT_LIST property")?
        .reply()
        .context("Failed to get window list from X11 server")?;

    let windows: Vec<Window> = prop
        .value32()
        .ok_or_else(|| anyhow::anyhow!("Invalid return from _NET_CLIENT_LIST"))?
        .collect();

    Ok(windows)
}

/// Walk up the window tree to the direct child of the root (the WM frame when reparented)
pub fn get_root_ancestor(conn: &RustConnection, root: Window, window: Window) -> Result<Window> {
    let mut current = window;
    loop {
        let tree = conn
            .query_tree(current)
            .context(format!("Failed to query tree for window {}", current))?
            .reply()
            .context(format!("Failed to get tree reply for window {}", current))?;

        if tree.parent == root || tree.parent == x11rb::NONE {
            return Ok(current);
        }
        current = tree.parent;
    }
}

/// Window bounds in root (screen) coordinates
pub fn get_window_bounds(conn: &RustConnection, root: Window, window: Window) -> Result<Rect> {
    let geometry = conn
        .get_geometry(window)
        .context(format!("Failed to query geometry for window {}", window))?
        .reply()
        .context(format!("Failed to get geometry reply for window {}", window))?;

    let origin = conn
        .translate_coordinates(window, root, 0, 0)
        .context(format!("Failed to translate origin of window {}", window))?
        .reply()
        .context(format!("Failed to get translate reply for window {}", window))?;

    Ok(Rect::new(
        i32::from(origin.dst_x),
        i32::from(origin.dst_y),
        u32::from(geometry.width),
        u32::from(geometry.height),
    ))
}
