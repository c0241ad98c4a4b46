//! Interactive session loop
//!
//! Owns the registry. Everything that touches windows runs off the loop: worker
//! flows on the blocking pool, the capture watcher on its own thread, surveys on
//! the blocking pool. Results come back as events and are applied here.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::command::{Command, HELP};
use super::reconcile::{self, Survey, Visibility};
use crate::common::events::{FleetEvent, StatusReporter, WorkerKind};
use crate::common::types::{SlotId, WindowHandle};
use crate::config::FleetConfig;
use crate::fleet::{
    Action, CaptureWatcher, DeliveryStatus, InputBroadcaster, LaunchCoordinator, WindowActivator,
    WindowRegistry, WorkerGate,
};
use crate::platform::Platform;

/// Pending operator lines before the stdin thread blocks
const COMMAND_QUEUE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    platform: Arc<dyn Platform>,
    config: FleetConfig,
    registry: WindowRegistry,
    visibility: BTreeMap<SlotId, Visibility>,
    activator: WindowActivator,
    launcher: LaunchCoordinator,
    broadcaster: InputBroadcaster,
    launch_gate: WorkerGate,
    broadcast_gate: WorkerGate,
    events_tx: UnboundedSender<FleetEvent>,
    events_rx: UnboundedReceiver<FleetEvent>,
    survey_tx: UnboundedSender<Survey>,
    survey_rx: UnboundedReceiver<Survey>,
    survey_in_flight: bool,
    capture_armed: Arc<AtomicBool>,
}

impl Session {
    pub fn new(platform: Arc<dyn Platform>, config: FleetConfig) -> Self {
        let timings = config.timings.clone();
        let activator =
            WindowActivator::new(Arc::clone(&platform), timings.clone(), config.focus_unlock_key);
        let launcher =
            LaunchCoordinator::new(Arc::clone(&platform), activator.clone(), timings.clone());
        let broadcaster = InputBroadcaster::new(Arc::clone(&platform), activator.clone(), timings);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (survey_tx, survey_rx) = mpsc::unbounded_channel();

        Self {
            platform,
            config,
            registry: WindowRegistry::new(),
            visibility: BTreeMap::new(),
            activator,
            launcher,
            broadcaster,
            launch_gate: WorkerGate::new(WorkerKind::Launch),
            broadcast_gate: WorkerGate::new(WorkerKind::Broadcast),
            events_tx,
            events_rx,
            survey_tx,
            survey_rx,
            survey_in_flight: false,
            capture_armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(COMMAND_QUEUE);
        spawn_stdin_reader(line_tx)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let watcher = self.spawn_capture_watcher(Arc::clone(&shutdown))?;

        let mut tick = tokio::time::interval(self.config.timings.reconcile_tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        println!(
            "browser-fleet ready. `help` lists commands; {} arms click capture.",
            self.config.capture.arm_key
        );
        info!("Session running");

        loop {
            tokio::select! {
                line = line_rx.recv() => match line {
                    Some(line) => {
                        if self.handle_line(&line).await == Flow::Quit {
                            break;
                        }
                    }
                    None => {
                        info!("Input closed, ending session");
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                Some(survey) = self.survey_rx.recv() => self.apply_survey(survey),
                _ = tick.tick() => self.start_survey(),
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, ending session");
                    break;
                }
            }
        }

        shutdown.store(true, Ordering::Release);
        if !matches!(
            tokio::task::spawn_blocking(move || watcher.join()).await,
            Ok(Ok(()))
        ) {
            warn!("Capture watcher did not shut down cleanly");
        }
        if !self.registry.is_empty() {
            info!(windows = self.registry.len(), "Leaving managed windows open");
        }
        Ok(())
    }

    fn spawn_capture_watcher(&mut self, shutdown: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let watcher = CaptureWatcher::new(
            Arc::clone(&self.platform),
            self.config.capture.clone(),
            self.registry.view(),
            self.broadcaster.clone(),
            self.broadcast_gate.clone(),
            Arc::new(self.events_tx.clone()),
        );
        self.capture_armed = watcher.armed_flag();

        std::thread::Builder::new()
            .name("capture-watcher".to_string())
            .spawn(move || watcher.run(shutdown))
            .context("Failed to start capture watcher thread")
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                println!("error: {}", e);
                return Flow::Continue;
            }
        };
        debug!(command = ?command, "Operator command");

        match command {
            Command::Launch(slots) => self.start_launch(slots),
            Command::Broadcast(action) => self.start_broadcast(action),
            Command::Activate { slot, focus } => self.activate(slot, focus),
            Command::ActivateAll => self.activate_all(),
            Command::MinimizeAll => self.minimize_all(),
            Command::Close(slot) => self.close(slot),
            Command::CloseAll => self.close_all(),
            Command::Status => self.print_status(),
            Command::Help => println!("{}", HELP),
            Command::Quit { close } => {
                if close {
                    self.close_all_and_wait().await;
                }
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    fn handle_event(&mut self, event: FleetEvent) {
        match &event {
            FleetEvent::Progress(line) => println!("  {}", line),
            FleetEvent::Managed { slot, window } => {
                if self.registry.apply(&event) {
                    debug!(slot = %slot, window = %window, "Binding applied");
                }
            }
            FleetEvent::Finished(kind) => {
                println!("{} finished", kind);
                if *kind == WorkerKind::Launch {
                    self.start_survey();
                }
            }
            FleetEvent::CaptureArmed => println!(
                "capture armed: click inside a managed window ({} cancels)",
                self.config.capture.cancel_key
            ),
            FleetEvent::CaptureCancelled(reason) => println!("capture cancelled: {}", reason),
            FleetEvent::Captured { slot, point } => {
                println!("captured click at {} in slot {}, replaying", point, slot)
            }
        }
    }

    fn start_survey(&mut self) {
        if self.survey_in_flight {
            return;
        }
        self.survey_in_flight = true;

        let platform = Arc::clone(&self.platform);
        let snapshot = self.registry.snapshot();
        let tx = self.survey_tx.clone();
        tokio::task::spawn_blocking(move || {
            let survey = reconcile::survey(platform.as_ref(), &snapshot);
            // Receiver only disappears with the session
            let _ = tx.send(survey);
        });
    }

    fn apply_survey(&mut self, survey: Survey) {
        self.survey_in_flight = false;
        for slot in self.registry.evict_stale(&survey.stale) {
            println!("slot {} window closed", slot);
        }
        self.visibility = survey.visibility;
    }

    fn start_launch(&mut self, slots: Vec<SlotId>) {
        let Some(permit) = self.launch_gate.try_acquire() else {
            println!("a launch is already running");
            return;
        };

        let launcher = self.launcher.clone();
        let snapshot = self.registry.snapshot();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let outcome = launcher.run(&slots, &snapshot, &tx);
            debug!(
                managed = outcome.managed.len(),
                unmatched = ?outcome.unmatched,
                "Launch run ended"
            );
        });
    }

    fn start_broadcast(&mut self, action: Action) {
        let Some(permit) = self.broadcast_gate.try_acquire() else {
            println!("a broadcast is already running");
            return;
        };

        let broadcaster = self.broadcaster.clone();
        let snapshot = self.registry.snapshot();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let missed: Vec<String> = broadcaster
                .broadcast(&action, &snapshot, &tx)
                .iter()
                .filter(|outcome| outcome.status != DeliveryStatus::Delivered)
                .map(|outcome| format!("{}@{}", outcome.slot, outcome.window))
                .collect();
            if !missed.is_empty() {
                warn!(windows = ?missed, "Action not delivered everywhere");
            }
        });
    }

    fn managed_window(&self, slot: SlotId) -> Option<WindowHandle> {
        let window = self.registry.get(slot);
        if window.is_none() {
            println!("slot {} is not managed", slot);
        }
        window
    }

    fn activate(&self, slot: SlotId, focus: bool) {
        let Some(window) = self.managed_window(slot) else {
            return;
        };
        let activator = self.activator.clone();
        tokio::task::spawn_blocking(move || {
            if !activator.bring_to_front(window, focus) {
                warn!(slot = %slot, window = %window, "Failed to raise window");
            }
        });
    }

    fn activate_all(&self) {
        let Some(permit) = self.broadcast_gate.try_acquire() else {
            println!("a broadcast is already running");
            return;
        };
        let windows = self.registry.snapshot().windows();
        let activator = self.activator.clone();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let raised = activator.activate_all(&windows);
            tx.progress(format!("raised {}/{} windows", raised, windows.len()));
        });
    }

    fn minimize_all(&self) {
        let windows = self.registry.snapshot().windows();
        let activator = self.activator.clone();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let minimized = windows.iter().filter(|&&w| activator.minimize(w)).count();
            tx.progress(format!("minimized {}/{} windows", minimized, windows.len()));
        });
    }

    fn close(&self, slot: SlotId) {
        let Some(window) = self.managed_window(slot) else {
            return;
        };
        let activator = self.activator.clone();
        tokio::task::spawn_blocking(move || {
            if !activator.close(window) {
                warn!(slot = %slot, window = %window, "Close request failed");
            }
        });
    }

    fn close_all(&self) {
        let windows = self.registry.snapshot().windows();
        let activator = self.activator.clone();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let closed = close_windows(&activator, &windows);
            tx.progress(format!("asked {}/{} windows to close", closed, windows.len()));
        });
    }

    async fn close_all_and_wait(&self) {
        let windows = self.registry.snapshot().windows();
        let activator = self.activator.clone();
        match tokio::task::spawn_blocking(move || close_windows(&activator, &windows)).await {
            Ok(closed) => info!(closed = closed, "Closed managed windows"),
            Err(e) => warn!(error = %e, "Closing windows failed"),
        }
    }

    fn print_status(&self) {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            println!("no managed windows");
        }
        for (slot, window) in snapshot.iter() {
            let visibility = self
                .visibility
                .get(&slot)
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string());
            println!("  slot {:>3}  {}  {}", slot, window, visibility);
        }

        let state = |busy: bool| if busy { "running" } else { "idle" };
        let gates: Vec<String> = [&self.launch_gate, &self.broadcast_gate]
            .iter()
            .map(|gate| format!("{}: {}", gate.kind(), state(gate.is_busy())))
            .collect();
        println!(
            "{}  capture: {}",
            gates.join("  "),
            if self.capture_armed.load(Ordering::Acquire) {
                "armed"
            } else {
                "idle"
            }
        );
    }
}

fn close_windows(activator: &WindowActivator, windows: &[WindowHandle]) -> usize {
    windows.iter().filter(|&&w| activator.close(w)).count()
}

/// Forward stdin lines to the session loop from a dedicated thread
fn spawn_stdin_reader(tx: mpsc::Sender<String>) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break; // Session ended
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read from stdin");
                        break;
                    }
                }
            }
        })
        .context("Failed to start stdin reader thread")?;
    Ok(())
}
