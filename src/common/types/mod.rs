//! Domain types for type safety and clarity

pub mod geometry;
pub mod key;
pub mod slot;

pub use geometry::{DisplayInfo, Point, Rect};
pub use key::{Key, Shortcut};
pub use slot::{SlotId, WindowHandle, parse_slot_list};
