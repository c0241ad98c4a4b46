//! Terminal front-end standing in for a control panel

mod command;
mod controller;
mod reconcile;

pub use controller::Session;
