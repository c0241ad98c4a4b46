//! Hotkey-armed click capture
//!
//! Pressing the arm key makes the next left click count: if it lands in a
//! managed window, the click position (relative to that window) is replayed as
//! a click in every managed window. A click anywhere else, or the cancel key,
//! disarms without broadcasting. Each arming ends in exactly one capture or
//! one cancellation.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use super::broadcast::{Action, InputBroadcaster};
use super::gate::WorkerGate;
use super::registry::{RegistrySnapshot, RegistryView};
use crate::common::events::{FleetEvent, StatusReporter};
use crate::common::types::{Point, SlotId, WindowHandle};
use crate::config::{CaptureSettings, pause};
use crate::platform::{Platform, WindowSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Armed,
}

/// Global input state at one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSample {
    pub arm_down: bool,
    pub cancel_down: bool,
    pub left_down: bool,
    pub cursor: Point,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Armed,
    Cancelled(String),
    Captured {
        slot: SlotId,
        window: WindowHandle,
        point: Point,
    },
}

/// Edge-triggered Idle/Armed state machine
pub struct ClickCaptureBridge {
    state: CaptureState,
    armed: Arc<AtomicBool>,
    debounce: Duration,
    last_arm: Option<Instant>,
    previous: InputSample,
}

impl ClickCaptureBridge {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: CaptureState::Idle,
            armed: Arc::new(AtomicBool::new(false)),
            debounce,
            last_arm: None,
            previous: InputSample::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Mirrors `state() == Armed` for readers on other threads
    pub fn armed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.armed)
    }

    pub fn observe<W: WindowSystem + ?Sized>(
        &mut self,
        sample: InputSample,
        now: Instant,
        windows: &W,
        registry: &RegistrySnapshot,
    ) -> Option<CaptureEvent> {
        let previous = std::mem::replace(&mut self.previous, sample);
        let arm_pressed = sample.arm_down && !previous.arm_down;
        let cancel_pressed = sample.cancel_down && !previous.cancel_down;
        let left_pressed = sample.left_down && !previous.left_down;

        match self.state {
            CaptureState::Idle => {
                if !arm_pressed {
                    return None;
                }
                if let Some(last) = self.last_arm
                    && now.saturating_duration_since(last) < self.debounce
                {
                    debug!("Arm key bounce ignored");
                    return None;
                }
                self.last_arm = Some(now);
                self.set_state(CaptureState::Armed);
                Some(CaptureEvent::Armed)
            }
            CaptureState::Armed => {
                if cancel_pressed {
                    self.set_state(CaptureState::Idle);
                    return Some(CaptureEvent::Cancelled("cancelled".to_string()));
                }
                if !left_pressed {
                    return None;
                }

                self.set_state(CaptureState::Idle);
                match resolve_click(windows, registry, sample.cursor) {
                    Ok(Some((slot, window, point))) => Some(CaptureEvent::Captured {
                        slot,
                        window,
                        point,
                    }),
                    Ok(None) => Some(CaptureEvent::Cancelled(
                        "click outside managed windows".to_string(),
                    )),
                    Err(e) => {
                        debug!(error = %e, "Could not resolve clicked window");
                        Some(CaptureEvent::Cancelled("click could not be resolved".to_string()))
                    }
                }
            }
        }
    }

    fn set_state(&mut self, state: CaptureState) {
        debug!(from = ?self.state, to = ?state, "Capture state change");
        self.state = state;
        self.armed
            .store(state == CaptureState::Armed, Ordering::Release);
    }
}

/// Managed slot, window and client-relative point under a screen position
fn resolve_click<W: WindowSystem + ?Sized>(
    windows: &W,
    registry: &RegistrySnapshot,
    cursor: Point,
) -> Result<Option<(SlotId, WindowHandle, Point)>> {
    let Some(window) = windows.toplevel_at(cursor)? else {
        return Ok(None);
    };
    let Some(slot) = registry.slot_of(window) else {
        debug!(window = %window, "Clicked window is not managed");
        return Ok(None);
    };
    let point = windows.screen_to_client(window, cursor)?;
    Ok(Some((slot, window, point)))
}

/// Polls key and pointer state and drives the bridge; runs on its own thread
pub struct CaptureWatcher {
    bridge: ClickCaptureBridge,
    platform: Arc<dyn Platform>,
    settings: CaptureSettings,
    view: RegistryView,
    broadcaster: InputBroadcaster,
    gate: WorkerGate,
    reporter: Arc<dyn StatusReporter>,
}

impl CaptureWatcher {
    pub fn new(
        platform: Arc<dyn Platform>,
        settings: CaptureSettings,
        view: RegistryView,
        broadcaster: InputBroadcaster,
        gate: WorkerGate,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            bridge: ClickCaptureBridge::new(Duration::from_millis(settings.debounce_ms)),
            platform,
            settings,
            view,
            broadcaster,
            gate,
            reporter,
        }
    }

    pub fn armed_flag(&self) -> Arc<AtomicBool> {
        self.bridge.armed_flag()
    }

    fn sample(&self) -> Result<InputSample> {
        Ok(InputSample {
            arm_down: self.platform.is_key_down(self.settings.arm_key)?,
            cancel_down: self.platform.is_key_down(self.settings.cancel_key)?,
            left_down: self.platform.is_left_button_down()?,
            cursor: self.platform.cursor_position()?,
        })
    }

    /// Take one sample and act on whatever transition it causes
    pub fn poll_once(&mut self) -> Option<CaptureEvent> {
        let sample = match self.sample() {
            Ok(sample) => sample,
            Err(e) => {
                debug!(error = %e, "Input state poll failed");
                return None;
            }
        };

        let registry = self.view.current();
        let event = self
            .bridge
            .observe(sample, Instant::now(), self.platform.as_ref(), &registry)?;

        match &event {
            CaptureEvent::Armed => {
                info!(key = %self.settings.arm_key, "Click capture armed");
                self.reporter.report(FleetEvent::CaptureArmed);
            }
            CaptureEvent::Cancelled(reason) => {
                info!(reason = %reason, "Click capture cancelled");
                self.reporter
                    .report(FleetEvent::CaptureCancelled(reason.clone()));
            }
            CaptureEvent::Captured { slot, point, .. } => {
                info!(slot = %slot, point = %point, "Click captured");
                self.reporter.report(FleetEvent::Captured {
                    slot: *slot,
                    point: *point,
                });
                self.replay_click(*point, &registry);
            }
        }
        Some(event)
    }

    fn replay_click(&self, point: Point, registry: &RegistrySnapshot) {
        let Some(_permit) = self.gate.try_acquire() else {
            self.reporter
                .progress("another broadcast is running, click not replayed".to_string());
            return;
        };
        self.broadcaster
            .broadcast(&Action::Click(point), registry, self.reporter.as_ref());
    }

    #[instrument(skip_all)]
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        info!(
            arm = %self.settings.arm_key,
            cancel = %self.settings.cancel_key,
            "Capture watcher started"
        );
        let interval = Duration::from_millis(self.settings.poll_interval_ms.max(1));
        while !shutdown.load(Ordering::Acquire) {
            self.poll_once();
            pause(interval);
        }
        debug!("Capture watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::events::{RecordingReporter, WorkerKind};
    use crate::common::types::{Key, Rect};
    use crate::config::Timings;
    use crate::fleet::activator::WindowActivator;
    use crate::fleet::registry::WindowRegistry;
    use crate::platform::fake::FakePlatform;

    fn slot(id: u32) -> SlotId {
        SlotId::new(id).unwrap()
    }

    fn handle(id: u32) -> WindowHandle {
        WindowHandle(0x0100_0000 + id)
    }

    fn sample(arm: bool, cancel: bool, left: bool, cursor: Point) -> InputSample {
        InputSample {
            arm_down: arm,
            cancel_down: cancel,
            left_down: left,
            cursor,
        }
    }

    /// Managed windows side by side, 1000px apart, 100px from the top
    fn fleet(slots: &[u32]) -> (Arc<FakePlatform>, WindowRegistry) {
        let platform = Arc::new(FakePlatform::new());
        let mut registry = WindowRegistry::new();
        for &id in slots {
            platform.add_window(handle(id), Rect::new(id as i32 * 1000, 100, 400, 300));
            registry.bind(slot(id), handle(id));
        }
        (platform, registry)
    }

    #[test]
    fn test_arm_then_click_on_managed_window() {
        let (platform, registry) = fleet(&[7]);
        let snapshot = registry.snapshot();
        let mut bridge = ClickCaptureBridge::new(Duration::from_millis(300));
        let armed = bridge.armed_flag();
        let t0 = Instant::now();
        let cursor = Point::new(7120, 140);

        assert_eq!(
            bridge.observe(sample(true, false, false, cursor), t0, platform.as_ref(), &snapshot),
            Some(CaptureEvent::Armed)
        );
        assert!(armed.load(Ordering::Acquire));

        // Holding the key does not re-arm; nothing until the click
        assert_eq!(
            bridge.observe(sample(true, false, false, cursor), t0, platform.as_ref(), &snapshot),
            None
        );

        assert_eq!(
            bridge.observe(sample(false, false, true, cursor), t0, platform.as_ref(), &snapshot),
            Some(CaptureEvent::Captured {
                slot: slot(7),
                window: handle(7),
                point: Point::new(120, 40),
            })
        );
        assert_eq!(bridge.state(), CaptureState::Idle);
        assert!(!armed.load(Ordering::Acquire));
    }

    #[test]
    fn test_button_held_while_arming_needs_fresh_press() {
        let (platform, registry) = fleet(&[7]);
        let snapshot = registry.snapshot();
        let mut bridge = ClickCaptureBridge::new(Duration::ZERO);
        let t0 = Instant::now();
        let cursor = Point::new(7120, 140);

        bridge.observe(sample(true, false, true, cursor), t0, platform.as_ref(), &snapshot);
        assert_eq!(
            bridge.observe(sample(false, false, true, cursor), t0, platform.as_ref(), &snapshot),
            None
        );
        assert_eq!(bridge.state(), CaptureState::Armed);
    }

    #[test]
    fn test_click_outside_managed_windows_cancels() {
        let (platform, registry) = fleet(&[7]);
        platform.add_window(WindowHandle(0x0900_0000), Rect::new(0, 0, 500, 500));
        let snapshot = registry.snapshot();
        let mut bridge = ClickCaptureBridge::new(Duration::ZERO);
        let t0 = Instant::now();

        bridge.observe(sample(true, false, false, Point::default()), t0, platform.as_ref(), &snapshot);
        let event = bridge.observe(
            sample(false, false, true, Point::new(50, 50)),
            t0,
            platform.as_ref(),
            &snapshot,
        );
        assert!(matches!(event, Some(CaptureEvent::Cancelled(_))));
        assert_eq!(bridge.state(), CaptureState::Idle);

        // Empty desktop is the same as a foreign window
        bridge.observe(sample(true, false, false, Point::default()), t0, platform.as_ref(), &snapshot);
        let event = bridge.observe(
            sample(false, false, true, Point::new(-5000, -5000)),
            t0,
            platform.as_ref(),
            &snapshot,
        );
        assert!(matches!(event, Some(CaptureEvent::Cancelled(_))));
    }

    #[test]
    fn test_cancel_key_disarms() {
        let (platform, registry) = fleet(&[7]);
        let snapshot = registry.snapshot();
        let mut bridge = ClickCaptureBridge::new(Duration::ZERO);
        let t0 = Instant::now();

        bridge.observe(sample(true, false, false, Point::default()), t0, platform.as_ref(), &snapshot);
        assert_eq!(
            bridge.observe(sample(false, true, false, Point::default()), t0, platform.as_ref(), &snapshot),
            Some(CaptureEvent::Cancelled("cancelled".to_string()))
        );
        assert!(!bridge.armed_flag().load(Ordering::Acquire));
    }

    #[test]
    fn test_arm_presses_debounced() {
        let (platform, registry) = fleet(&[]);
        let snapshot = registry.snapshot();
        let mut bridge = ClickCaptureBridge::new(Duration::from_millis(300));
        let t0 = Instant::now();
        let up = sample(false, false, false, Point::default());
        let arm = sample(true, false, false, Point::default());
        let cancel = sample(false, true, false, Point::default());

        bridge.observe(arm, t0, platform.as_ref(), &snapshot);
        bridge.observe(cancel, t0 + Duration::from_millis(50), platform.as_ref(), &snapshot);
        bridge.observe(up, t0 + Duration::from_millis(60), platform.as_ref(), &snapshot);

        assert_eq!(
            bridge.observe(arm, t0 + Duration::from_millis(100), platform.as_ref(), &snapshot),
            None
        );
        bridge.observe(up, t0 + Duration::from_millis(200), platform.as_ref(), &snapshot);
        assert_eq!(
            bridge.observe(arm, t0 + Duration::from_millis(400), platform.as_ref(), &snapshot),
            Some(CaptureEvent::Armed)
        );
    }

    #[test]
    fn test_watcher_replays_click_to_every_managed_slot() {
        let (platform, registry) = fleet(&[3, 7, 9]);
        let timings = Timings::instant();
        let activator = WindowActivator::new(platform.clone(), timings.clone(), None);
        let broadcaster = InputBroadcaster::new(platform.clone(), activator, timings);
        let reporter = Arc::new(RecordingReporter::new());
        let settings = CaptureSettings::default();

        let mut watcher = CaptureWatcher::new(
            platform.clone(),
            settings.clone(),
            registry.view(),
            broadcaster,
            WorkerGate::new(WorkerKind::Broadcast),
            reporter.clone(),
        );

        platform.set_key_down(settings.arm_key, true);
        assert_eq!(watcher.poll_once(), Some(CaptureEvent::Armed));
        assert!(watcher.armed_flag().load(Ordering::Acquire));

        platform.set_key_down(settings.arm_key, false);
        platform.set_pointer(Point::new(7120, 140), true);
        let event = watcher.poll_once();
        assert!(matches!(event, Some(CaptureEvent::Captured { .. })));
        assert!(!watcher.armed_flag().load(Ordering::Acquire));

        let click = Point::new(120, 40);
        assert_eq!(
            platform.clicks(),
            vec![(handle(3), click), (handle(7), click), (handle(9), click)]
        );

        let events = reporter.events();
        assert_eq!(events[0], FleetEvent::CaptureArmed);
        assert_eq!(
            events[1],
            FleetEvent::Captured {
                slot: slot(7),
                point: click
            }
        );
        assert_eq!(events.last(), Some(&FleetEvent::Finished(WorkerKind::Broadcast)));
    }

    #[test]
    fn test_watcher_does_not_replay_while_broadcast_busy() {
        let (platform, registry) = fleet(&[7]);
        let timings = Timings::instant();
        let activator = WindowActivator::new(platform.clone(), timings.clone(), None);
        let broadcaster = InputBroadcaster::new(platform.clone(), activator, timings);
        let gate = WorkerGate::new(WorkerKind::Broadcast);
        let _busy = gate.try_acquire().unwrap();

        let mut watcher = CaptureWatcher::new(
            platform.clone(),
            CaptureSettings::default(),
            registry.view(),
            broadcaster,
            gate.clone(),
            Arc::new(RecordingReporter::new()),
        );

        platform.set_key_down(Key::Function(8), true);
        watcher.poll_once();
        platform.set_pointer(Point::new(7120, 140), true);
        watcher.poll_once();
        assert!(platform.clicks().is_empty());
    }
}
