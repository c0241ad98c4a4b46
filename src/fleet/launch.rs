//! Launching browser instances and matching their windows to slots
//!
//! Spawned processes cannot be correlated with the windows they create (the
//! browser hands new windows to an already running process), so matching is
//! by order of appearance: the first unknown window after the spawns goes to
//! the lowest missing slot, the next to the next one, and so on.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::activator::WindowActivator;
use super::layout::Topology;
use super::registry::RegistrySnapshot;
use crate::common::events::{FleetEvent, StatusReporter, WorkerKind};
use crate::common::types::{SlotId, WindowHandle};
use crate::config::{Timings, pause};
use crate::platform::Platform;

/// One instance start, alive for a single launch run
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest {
    pub slot: SlotId,
    pub spawn_time: Instant,
}

impl LaunchRequest {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            spawn_time: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Partition,
    ReuseExisting,
    SpawnMissing,
    PollMatch,
    Done,
}

/// Result of one launch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Slots managed by this run, reused ones first, then in match order
    pub managed: Vec<(SlotId, WindowHandle)>,
    /// Requested slots that never got a window before the deadline
    pub unmatched: Vec<SlotId>,
}

#[derive(Clone)]
pub struct LaunchCoordinator {
    platform: Arc<dyn Platform>,
    activator: WindowActivator,
    timings: Timings,
}

impl LaunchCoordinator {
    pub fn new(platform: Arc<dyn Platform>, activator: WindowActivator, timings: Timings) -> Self {
        Self {
            platform,
            activator,
            timings,
        }
    }

    /// Bring every requested slot under management. Emits `Managed` for each
    /// bound slot and exactly one `Finished(Launch)`, whatever happens.
    #[instrument(skip_all, fields(requested = slots.len()))]
    pub fn run(
        &self,
        slots: &[SlotId],
        registry: &RegistrySnapshot,
        reporter: &dyn StatusReporter,
    ) -> LaunchOutcome {
        let outcome = self.run_phases(slots, registry, reporter);
        reporter.report(FleetEvent::Finished(WorkerKind::Launch));
        outcome
    }

    fn run_phases(
        &self,
        slots: &[SlotId],
        registry: &RegistrySnapshot,
        reporter: &dyn StatusReporter,
    ) -> LaunchOutcome {
        let mut outcome = LaunchOutcome::default();

        let mut requested = slots.to_vec();
        requested.sort();
        requested.dedup();
        if requested.is_empty() {
            return outcome;
        }

        let topology = match Topology::discover(self.platform.as_ref()) {
            Ok(Some(topology)) => topology,
            Ok(None) => {
                warn!("No displays reported, nothing launched");
                reporter.progress("no displays detected".to_string());
                outcome.unmatched = requested;
                return outcome;
            }
            Err(e) => {
                warn!(error = %e, "Display discovery failed, nothing launched");
                reporter.progress("display discovery failed".to_string());
                outcome.unmatched = requested;
                return outcome;
            }
        };

        debug!(phase = ?LaunchPhase::Partition);
        let (existing, missing): (Vec<SlotId>, Vec<SlotId>) =
            requested.iter().copied().partition(|&slot| {
                registry
                    .window(slot)
                    .is_some_and(|window| self.platform.is_valid(window))
            });

        debug!(phase = ?LaunchPhase::ReuseExisting, count = existing.len());
        for slot in existing {
            let Some(window) = registry.window(slot) else {
                continue;
            };
            if !self.activator.activate_and_move(window, topology.target_rect(slot)) {
                debug!(slot = %slot, window = %window, "Reused window not fully activated");
            }
            reporter.report(FleetEvent::Managed { slot, window });
            reporter.progress(format!("slot {} already open", slot));
            outcome.managed.push((slot, window));
        }

        if missing.is_empty() {
            debug!(phase = ?LaunchPhase::Done);
            return outcome;
        }

        debug!(phase = ?LaunchPhase::SpawnMissing, count = missing.len());
        let mut known: HashSet<WindowHandle> = match self.platform.app_windows() {
            Ok(windows) => windows.into_iter().collect(),
            Err(e) => {
                // Without a baseline every existing window would look new
                warn!(error = %e, "Window enumeration failed, nothing launched");
                reporter.progress("window enumeration failed".to_string());
                outcome.unmatched = missing;
                return outcome;
            }
        };
        debug!(baseline = known.len(), "Baseline captured");

        let mut pending: VecDeque<LaunchRequest> = VecDeque::with_capacity(missing.len());
        for &slot in &missing {
            let request = LaunchRequest::new(slot);
            if let Err(e) = self.platform.spawn_instance(&request) {
                warn!(slot = %slot, error = %e, "Failed to start instance");
            }
            // A failed spawn keeps its place and simply ages out
            pending.push_back(request);
        }
        reporter.progress(format!("launching {} instance(s)", missing.len()));

        debug!(phase = ?LaunchPhase::PollMatch);
        let total = missing.len();
        let mut matched = 0usize;
        let deadline = Instant::now() + self.timings.launch_deadline();

        while !pending.is_empty() && Instant::now() < deadline {
            pause(self.timings.launch_poll());

            let windows = match self.platform.app_windows() {
                Ok(windows) => windows,
                Err(e) => {
                    debug!(error = %e, "Window enumeration failed during poll");
                    continue;
                }
            };

            for window in windows {
                if pending.is_empty() {
                    break;
                }
                if !known.insert(window) {
                    continue;
                }
                let Some(request) = pending.pop_front() else {
                    break;
                };
                matched += 1;

                info!(
                    slot = %request.slot,
                    window = %window,
                    elapsed_ms = request.spawn_time.elapsed().as_millis() as u64,
                    "Matched new window to slot"
                );
                if !self
                    .activator
                    .activate_and_move(window, topology.target_rect(request.slot))
                {
                    debug!(slot = %request.slot, window = %window, "New window not fully activated");
                }
                reporter.report(FleetEvent::Managed {
                    slot: request.slot,
                    window,
                });
                reporter.progress(format!(
                    "slot {} detected ({}/{})",
                    request.slot, matched, total
                ));
                outcome.managed.push((request.slot, window));
            }
        }

        outcome.unmatched = pending.into_iter().map(|request| request.slot).collect();
        if !outcome.unmatched.is_empty() {
            let list: Vec<String> = outcome.unmatched.iter().map(ToString::to_string).collect();
            warn!(slots = ?list, "Launch deadline passed with unmatched slots");
            reporter.progress(format!("no window for slot(s) {}", list.join(", ")));
        }

        debug!(phase = ?LaunchPhase::Done, matched = matched);
        outcome
    }
}
