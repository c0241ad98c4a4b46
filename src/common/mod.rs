//! Shared types, constants and plumbing used by every layer

pub mod constants;
pub mod debug;
pub mod events;
pub mod types;
