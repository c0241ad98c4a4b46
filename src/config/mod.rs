//! Configuration management
//!
//! Handles the fleet configuration with JSON persistence: how the browser is
//! launched and recognised, the capture hotkeys, and every pacing delay.

pub mod settings;
pub mod timings;

pub use settings::{BrowserSettings, CaptureSettings, FleetConfig};
pub use timings::{Timings, pause};
