//! Display discovery via RandR monitors

use anyhow::{Context, Result};
use tracing::{debug, warn};
use x11rb::protocol::randr::ConnectionExt as RandrExt;
use x11rb::protocol::xproto::Screen;
use x11rb::rust_connection::RustConnection;

use crate::common::types::DisplayInfo;

/// Enumerate monitors; falls back to the whole screen when RandR is unavailable
pub fn query_displays(conn: &RustConnection, screen: &Screen) -> Result<Vec<DisplayInfo>> {
    match query_monitors(conn, screen) {
        Ok(displays) if !displays.is_empty() => Ok(displays),
        Ok(_) => {
            debug!("RandR reported no monitors, using root window bounds");
            Ok(vec![whole_screen(screen)])
        }
        Err(e) => {
            warn!(error = %e, "RandR monitor query failed, using root window bounds");
            Ok(vec![whole_screen(screen)])
        }
    }
}

fn query_monitors(conn: &RustConnection, screen: &Screen) -> Result<Vec<DisplayInfo>> {
    let reply = conn
        .randr_get_monitors(screen.root, true)
        .context("Failed to query RandR monitors")?
        .reply()
        .context("Failed to get RandR monitors reply")?;

    Ok(reply
        .monitors
        .iter()
        .map(|m| {
            DisplayInfo::new(
                m.primary,
                i32::from(m.x),
                i32::from(m.y),
                u32::from(m.width),
                u32::from(m.height),
            )
        })
        .collect())
}

fn whole_screen(screen: &Screen) -> DisplayInfo {
    DisplayInfo::new(
        true,
        0,
        0,
        u32::from(screen.width_in_pixels),
        u32::from(screen.height_in_pixels),
    )
}
