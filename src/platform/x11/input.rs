//! Global input state and synthetic key injection (XTEST)

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::xtest::ConnectionExt as XTestExt;
use x11rb::rust_connection::RustConnection;

/// Press or release a physical keycode as if typed on the keyboard
pub fn fake_key(conn: &RustConnection, root: Window, keycode: Keycode, pressed: bool) -> Result<()> {
    let type_ = if pressed {
        KEY_PRESS_EVENT
    } else {
        KEY_RELEASE_EVENT
    };

    conn.xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, root, 0, 0, 0)
        .context(format!("Failed to inject key event for keycode {}", keycode))?;
    conn.flush()
        .context("Failed to flush X11 connection after key injection")?;
    Ok(())
}

/// Whether `keycode` is down in the server's current keymap
pub fn is_keycode_down(conn: &RustConnection, keycode: Keycode) -> Result<bool> {
    let keymap = conn
        .query_keymap()
        .context("Failed to query keymap")?
        .reply()
        .context("Failed to get keymap reply")?;

    Ok(keymap_bit(&keymap.keys, keycode))
}

/// Bit `keycode` of the 256-bit QueryKeymap vector
pub fn keymap_bit(keys: &[u8; 32], keycode: Keycode) -> bool {
    let byte = keys[usize::from(keycode / 8)];
    byte & (1 << (keycode % 8)) != 0
}

/// Pointer position on the root window plus button state
pub fn query_pointer_state(conn: &RustConnection, root: Window) -> Result<(i16, i16, KeyButMask)> {
    let reply = conn
        .query_pointer(root)
        .context("Failed to query pointer")?
        .reply()
        .context("Failed to get pointer reply")?;

    Ok((reply.root_x, reply.root_y, reply.mask))
}

/// Direct child of root under a screen point (the WM frame when reparented)
pub fn root_child_at(conn: &RustConnection, root: Window, x: i16, y: i16) -> Result<Option<Window>> {
    let reply = conn
        .translate_coordinates(root, root, x, y)
        .context("Failed to translate point on root window")?
        .reply()
        .context("Failed to get translate reply on root window")?;

    Ok((reply.child != x11rb::NONE).then_some(reply.child))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_bit() {
        let mut keys = [0u8; 32];
        keys[4] = 0b0000_0100; // keycode 34
        keys[31] = 0b1000_0000; // keycode 255

        assert!(keymap_bit(&keys, 34));
        assert!(!keymap_bit(&keys, 35));
        assert!(keymap_bit(&keys, 255));
        assert!(!keymap_bit(&keys, 8));
    }
}
