//! Grid placement of slots across displays
//!
//! Each display holds a 4x2 grid. Slots 2-9 and slots ending in 1-8 go to the
//! secondary display; the rest fill the primary. Only 8 cells exist per display,
//! so higher slots land on the same cells as lower ones.

use anyhow::Result;
use tracing::debug;

use crate::common::constants::layout;
use crate::common::types::{DisplayInfo, Rect, SlotId};
use crate::platform::DisplaySource;

/// Primary and secondary display of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub primary: DisplayInfo,
    pub secondary: DisplayInfo,
}

impl Topology {
    pub fn resolve(displays: &[DisplayInfo]) -> Option<Self> {
        resolve_displays(displays).map(|(primary, secondary)| Self { primary, secondary })
    }

    /// Query the OS; `None` when no display is reported
    pub fn discover<D: DisplaySource + ?Sized>(source: &D) -> Result<Option<Self>> {
        let displays = source.displays()?;
        debug!(count = displays.len(), "Discovered displays");
        Ok(Self::resolve(&displays))
    }

    pub fn target_rect(&self, slot: SlotId) -> Rect {
        target_rect(slot, &self.primary, &self.secondary)
    }
}

/// Primary is the display flagged primary (else the first); secondary is the
/// first display not flagged primary, else the primary again. Without any
/// flagged display both resolve to the first one.
pub fn resolve_displays(displays: &[DisplayInfo]) -> Option<(DisplayInfo, DisplayInfo)> {
    let primary = displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
        .copied()?;

    let secondary = displays
        .iter()
        .find(|d| !d.is_primary)
        .copied()
        .unwrap_or(primary);

    Some((primary, secondary))
}

/// Grid cell index (0..8) and whether the slot belongs on the secondary display
fn grid_cell(slot: SlotId) -> (u32, bool) {
    let id = slot.get();
    let rem = id % 10;

    if (2..=9).contains(&id) {
        (id - 2, true)
    } else if (1..=8).contains(&rem) {
        (rem - 1, true)
    } else {
        let cells = i64::from(layout::CELLS_PER_DISPLAY);
        let g = ((i64::from(id) - 9) % cells + cells) % cells;
        (g as u32, false)
    }
}

/// Deterministic target rectangle for a slot
pub fn target_rect(slot: SlotId, primary: &DisplayInfo, secondary: &DisplayInfo) -> Rect {
    let (cell, on_secondary) = grid_cell(slot);
    let display = if on_secondary { secondary } else { primary };

    let column = cell % layout::COLUMNS;
    let row = cell / layout::COLUMNS;

    let display_width = f64::from(display.width);
    let cell_width = (display_width / layout::WIDTH_DIVISOR).floor();
    let cell_height = display.height as i32 / layout::HEIGHT_DIVISOR;
    let gap = (display_width - cell_width) / layout::GAP_DIVISOR;

    // `as` truncates toward zero, which matters for displays left of the origin
    let x = (f64::from(display.x) + f64::from(column) * gap) as i32;
    let y = display.y + row as i32 * cell_height;

    Rect::new(x, y, cell_width as u32, cell_height.max(0) as u32)
}
