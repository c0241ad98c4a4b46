//! X11 connection context and cached state

use anyhow::{Context, Result};
use std::collections::HashMap;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_client_list: Atom,
    pub net_active_window: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_hidden: Atom,
    pub wm_change_state: Atom,
    pub wm_state: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            net_client_list: intern(conn, "_NET_CLIENT_LIST")?,
            net_active_window: intern(conn, "_NET_ACTIVE_WINDOW")?,
            net_wm_pid: intern(conn, "_NET_WM_PID")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_hidden: intern(conn, "_NET_WM_STATE_HIDDEN")?,
            wm_change_state: intern(conn, "WM_CHANGE_STATE")?,
            wm_state: intern(conn, "WM_STATE")?,
            wm_protocols: intern(conn, "WM_PROTOCOLS")?,
            wm_delete_window: intern(conn, "WM_DELETE_WINDOW")?,
        })
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .with_context(|| format!("Failed to intern {} atom", name))?
        .reply()
        .with_context(|| format!("Failed to get reply for {} atom", name))?
        .atom)
}

/// Keysym -> keycode table, built once from the server's keyboard mapping
pub struct KeycodeMap {
    codes: HashMap<u32, Keycode>,
}

impl KeycodeMap {
    pub fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let first = setup.min_keycode;
        let count = setup.max_keycode - setup.min_keycode + 1;

        let mapping = conn
            .get_keyboard_mapping(first, count)
            .context("Failed to query keyboard mapping")?
            .reply()
            .context("Failed to get keyboard mapping reply")?;

        Ok(Self::from_mapping(
            first,
            mapping.keysyms_per_keycode,
            &mapping.keysyms,
        ))
    }

    /// Lowest keycode wins when a keysym appears more than once
    pub fn from_mapping(first: Keycode, per_keycode: u8, keysyms: &[u32]) -> Self {
        let mut codes = HashMap::new();
        if per_keycode == 0 {
            return Self { codes };
        }

        for (index, chunk) in keysyms.chunks(usize::from(per_keycode)).enumerate() {
            let Ok(offset) = u8::try_from(index) else {
                break;
            };
            let keycode = first.saturating_add(offset);
            for &sym in chunk.iter().filter(|&&sym| sym != 0) {
                codes.entry(sym).or_insert(keycode);
            }
        }
        Self { codes }
    }

    pub fn keycode(&self, keysym: u32) -> Option<Keycode> {
        self.codes.get(&keysym).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycode_map_from_mapping() {
        // keycode 10: 'a'/'A', keycode 11: F5, keycode 12: duplicate 'a'
        let keysyms = [0x61, 0x41, 0xffc2, 0, 0x61, 0];
        let map = KeycodeMap::from_mapping(10, 2, &keysyms);

        assert_eq!(map.keycode(0x61), Some(10));
        assert_eq!(map.keycode(0x41), Some(10));
        assert_eq!(map.keycode(0xffc2), Some(11));
        assert_eq!(map.keycode(0xffe3), None);
    }

    #[test]
    fn test_keycode_map_zero_width() {
        let map = KeycodeMap::from_mapping(8, 0, &[0x61]);
        assert_eq!(map.keycode(0x61), None);
    }
}
