//! Events flowing from the fleet core to the front-end
//!
//! Worker flows never touch the front-end directly; they report through a
//! [`StatusReporter`], which on the session side is an unbounded tokio channel.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::common::types::{Point, SlotId, WindowHandle};

/// Which short-lived worker flow an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Launch,
    Broadcast,
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerKind::Launch => f.write_str("launch"),
            WorkerKind::Broadcast => f.write_str("broadcast"),
        }
    }
}

/// Messages sent from the fleet core to whoever owns the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    /// Human-readable progress line
    Progress(String),
    /// Slot is now managed at this handle; the registry owner binds it
    Managed { slot: SlotId, window: WindowHandle },
    /// A worker flow ran to completion (always sent exactly once per run)
    Finished(WorkerKind),
    /// Capture hotkey pressed; waiting for a click
    CaptureArmed,
    /// Armed capture ended without a click broadcast
    CaptureCancelled(String),
    /// A click inside a managed window was captured (client coordinates)
    Captured { slot: SlotId, point: Point },
}

/// Receives progress from worker flows
pub trait StatusReporter: Send + Sync {
    fn report(&self, event: FleetEvent);

    fn progress(&self, message: String) {
        info!(status = %message, "Progress");
        self.report(FleetEvent::Progress(message));
    }
}

impl StatusReporter for UnboundedSender<FleetEvent> {
    fn report(&self, event: FleetEvent) {
        if let Err(e) = self.send(event) {
            // Receiver gone means the session is shutting down
            debug!(event = ?e.0, "Dropping fleet event, front-end closed");
        }
    }
}

/// Reporter that keeps every event in memory, in order
#[cfg(test)]
#[derive(Default)]
pub struct RecordingReporter {
    events: std::sync::Mutex<Vec<FleetEvent>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FleetEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn progress_lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FleetEvent::Progress(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl StatusReporter for RecordingReporter {
    fn report(&self, event: FleetEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
