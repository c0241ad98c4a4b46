//! X11 window operations (raise, activate, move, minimize, close, click)

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use super::CachedAtoms;
use crate::common::constants::{mouse, x11};
use crate::common::types::{Point, Rect};

fn send_root_message(
    conn: &RustConnection,
    root: Window,
    window: Window,
    type_: Atom,
    data: [u32; 5],
) -> Result<()> {
    let event = ClientMessageEvent {
        response_type: CLIENT_MESSAGE_EVENT,
        format: 32,
        sequence: 0,
        window,
        type_,
        data: ClientMessageData::from(data),
    };

    conn.send_event(
        false,
        root,
        EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
        event,
    )
    .context(format!("Failed to send client message to root for window {}", window))?;
    Ok(())
}

/// Raise to the top of the stack without touching focus
pub fn raise_window(conn: &RustConnection, window: Window) -> Result<()> {
    conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
        .context(format!("Failed to raise window {} to top of stack", window))?;
    conn.flush()
        .context("Failed to flush X11 connection after raise")?;
    Ok(())
}

/// Activate (focus) an X11 window using _NET_ACTIVE_WINDOW
pub fn activate_window(
    conn: &RustConnection,
    root: Window,
    atoms: &CachedAtoms,
    window: Window,
) -> Result<()> {
    conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
        .context(format!("Failed to raise window {} to top of stack", window))?;

    send_root_message(
        conn,
        root,
        window,
        atoms.net_active_window,
        [x11::ACTIVE_WINDOW_SOURCE_PAGER, x11rb::CURRENT_TIME, 0, 0, 0],
    )?;

    conn.flush()
        .context("Failed to flush X11 connection after window activation")?;
    Ok(())
}

/// Un-minimize: clear _NET_WM_STATE_HIDDEN and map the window again
pub fn restore_window(
    conn: &RustConnection,
    root: Window,
    atoms: &CachedAtoms,
    window: Window,
) -> Result<()> {
    send_root_message(
        conn,
        root,
        window,
        atoms.net_wm_state,
        [
            x11::NET_WM_STATE_REMOVE,
            atoms.net_wm_state_hidden,
            0,
            x11::ACTIVE_WINDOW_SOURCE_PAGER,
            0,
        ],
    )?;

    conn.map_window(window)
        .context(format!("Failed to map window {}", window))?;
    conn.flush()
        .context("Failed to flush X11 connection after window restore")?;
    Ok(())
}

/// Map the window so it is visible
pub fn show_window(conn: &RustConnection, window: Window) -> Result<()> {
    conn.map_window(window)
        .context(format!("Failed to map window {}", window))?;
    conn.flush()
        .context("Failed to flush X11 connection after show")?;
    Ok(())
}

pub fn move_resize_window(conn: &RustConnection, window: Window, rect: Rect) -> Result<()> {
    conn.configure_window(
        window,
        &ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(rect.width.max(1))
            .height(rect.height.max(1)),
    )
    .context(format!("Failed to move window {} to {}", window, rect))?;
    conn.flush()
        .context("Failed to flush X11 connection after move")?;
    Ok(())
}

/// Minimize (hide) an X11 window using _NET_WM_STATE
pub fn minimize_window(
    conn: &RustConnection,
    root: Window,
    atoms: &CachedAtoms,
    window: Window,
) -> Result<()> {
    send_root_message(
        conn,
        root,
        window,
        atoms.net_wm_state,
        [
            x11::NET_WM_STATE_ADD,
            atoms.net_wm_state_hidden,
            0,
            x11::ACTIVE_WINDOW_SOURCE_PAGER,
            0,
        ],
    )?;

    // Fallback for WMs that expect ICCCM-style iconify requests
    send_root_message(
        conn,
        root,
        window,
        atoms.wm_change_state,
        [x11::ICONIC_STATE, 0, 0, 0, 0],
    )?;

    conn.flush()
        .context("Failed to flush X11 connection after window minimize")?;
    Ok(())
}

/// Ask the client to close via WM_DELETE_WINDOW (it may prompt or refuse)
pub fn close_window(conn: &RustConnection, atoms: &CachedAtoms, window: Window) -> Result<()> {
    let event = ClientMessageEvent {
        response_type: CLIENT_MESSAGE_EVENT,
        format: 32,
        sequence: 0,
        window,
        type_: atoms.wm_protocols,
        data: ClientMessageData::from([atoms.wm_delete_window, x11rb::CURRENT_TIME, 0, 0, 0]),
    };

    conn.send_event(false, window, EventMask::NO_EVENT, event)
        .context(format!("Failed to send WM_DELETE_WINDOW to window {}", window))?;
    conn.flush()
        .context("Failed to flush X11 connection after close request")?;
    Ok(())
}

/// Deliver a left button press/release pair straight to `window`
///
/// Sent with `send_event`, so it needs neither focus nor pointer movement.
pub fn post_button_click(
    conn: &RustConnection,
    root: Window,
    window: Window,
    client: Point,
    screen: Point,
) -> Result<()> {
    let (event_x, event_y) = client.to_i16();
    let (root_x, root_y) = screen.to_i16();

    let press = ButtonPressEvent {
        response_type: BUTTON_PRESS_EVENT,
        detail: mouse::BUTTON_LEFT,
        sequence: 0,
        time: x11rb::CURRENT_TIME,
        root,
        event: window,
        child: x11rb::NONE,
        root_x,
        root_y,
        event_x,
        event_y,
        state: KeyButMask::from(0u16),
        same_screen: true,
    };
    let release = ButtonReleaseEvent {
        response_type: BUTTON_RELEASE_EVENT,
        state: KeyButMask::BUTTON1,
        ..press
    };

    conn.send_event(true, window, EventMask::BUTTON_PRESS, press)
        .context(format!("Failed to post button press to window {}", window))?;
    conn.send_event(true, window, EventMask::BUTTON_RELEASE, release)
        .context(format!("Failed to post button release to window {}", window))?;
    conn.flush()
        .context("Failed to flush X11 connection after click")?;
    Ok(())
}
