//! At-most-one-run admission for worker flows

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::common::events::WorkerKind;

/// Rejects a new run while one of the same kind is active
#[derive(Debug, Clone)]
pub struct WorkerGate {
    kind: WorkerKind,
    busy: Arc<AtomicBool>,
}

impl WorkerGate {
    pub fn new(kind: WorkerKind) -> Self {
        Self {
            kind,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// `None` while another run holds the gate
    pub fn try_acquire(&self) -> Option<WorkerPermit> {
        match self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                debug!(kind = %self.kind, "Worker gate acquired");
                Some(WorkerPermit {
                    kind: self.kind,
                    busy: Arc::clone(&self.busy),
                })
            }
            Err(_) => None,
        }
    }
}

/// Held for the duration of a run; dropping it reopens the gate
#[derive(Debug)]
pub struct WorkerPermit {
    kind: WorkerKind,
    busy: Arc<AtomicBool>,
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        debug!(kind = %self.kind, "Worker gate released");
    }
}
