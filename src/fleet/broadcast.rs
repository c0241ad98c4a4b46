//! Replaying one input action across every managed window
//!
//! Windows are processed one at a time in slot order. Keyboard actions need
//! the target focused, so each window is raised with focus and given a moment
//! to settle first; clicks are posted straight to the window.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::activator::WindowActivator;
use super::registry::RegistrySnapshot;
use crate::common::events::{FleetEvent, StatusReporter, WorkerKind};
use crate::common::types::{Key, Point, Shortcut, SlotId, WindowHandle};
use crate::config::{Timings, pause};
use crate::platform::Platform;

/// One logical input sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Focus the address bar, paste the URL and submit, optionally in a new tab
    Navigate { url: String, new_tab: bool },
    Shortcut(Shortcut),
    /// Paste text into whatever has focus in the page
    SendText { text: String, with_enter: bool },
    /// Toggle developer tools
    DevTools,
    /// Left click at client coordinates
    Click(Point),
}

impl Action {
    /// Text staged on the clipboard once per batch
    fn clipboard_text(&self) -> Option<&str> {
        match self {
            Action::Navigate { url, .. } => Some(url),
            Action::SendText { text, .. } => Some(text),
            _ => None,
        }
    }

    fn label(&self) -> String {
        match self {
            Action::Navigate { .. } => "sent".to_string(),
            Action::Shortcut(shortcut) => shortcut.label().to_string(),
            Action::SendText { .. } => "typed".to_string(),
            Action::DevTools => "devtools".to_string(),
            Action::Click(point) => format!("click {}", point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// Window was gone by the time its turn came
    Skipped,
    /// Text was not typed because the window never took focus
    FocusFailed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOutcome {
    pub slot: SlotId,
    pub window: WindowHandle,
    pub status: DeliveryStatus,
}

#[derive(Clone)]
pub struct InputBroadcaster {
    platform: Arc<dyn Platform>,
    activator: WindowActivator,
    timings: Timings,
}

impl InputBroadcaster {
    pub fn new(platform: Arc<dyn Platform>, activator: WindowActivator, timings: Timings) -> Self {
        Self {
            platform,
            activator,
            timings,
        }
    }

    /// Deliver `action` to every window in `snapshot`. One failing window
    /// never stops the rest; `Finished(Broadcast)` is reported exactly once.
    #[instrument(skip_all, fields(windows = snapshot.len()))]
    pub fn broadcast(
        &self,
        action: &Action,
        snapshot: &RegistrySnapshot,
        reporter: &dyn StatusReporter,
    ) -> Vec<WindowOutcome> {
        let outcomes = self.broadcast_all(action, snapshot, reporter);
        reporter.report(FleetEvent::Finished(WorkerKind::Broadcast));
        outcomes
    }

    fn broadcast_all(
        &self,
        action: &Action,
        snapshot: &RegistrySnapshot,
        reporter: &dyn StatusReporter,
    ) -> Vec<WindowOutcome> {
        let total = snapshot.len();
        if total == 0 {
            debug!("Nothing to broadcast to");
            return Vec::new();
        }

        if let Some(text) = action.clipboard_text()
            && !self.stage_clipboard(text)
        {
            warn!("Clipboard unavailable, broadcast aborted");
            reporter.progress("clipboard unavailable, nothing sent".to_string());
            return snapshot
                .iter()
                .map(|(slot, window)| WindowOutcome {
                    slot,
                    window,
                    status: DeliveryStatus::Failed,
                })
                .collect();
        }

        let started = Instant::now();
        let label = action.label();
        let mut outcomes = Vec::with_capacity(total);
        let mut first = true;

        for (idx, (slot, window)) in snapshot.iter().enumerate() {
            let index = idx + 1;

            if !self.platform.is_valid(window) {
                debug!(slot = %slot, window = %window, "Window gone, skipping");
                reporter.progress(format!("slot {} skipped ({}/{})", slot, index, total));
                outcomes.push(WindowOutcome {
                    slot,
                    window,
                    status: DeliveryStatus::Skipped,
                });
                continue;
            }

            let status = self.deliver(action, window, first);
            first = false;

            match status {
                DeliveryStatus::Delivered => {
                    reporter.progress(format!("{} ({}/{})", label, index, total));
                }
                DeliveryStatus::FocusFailed => {
                    reporter.progress(format!(
                        "slot {} did not take focus ({}/{})",
                        slot, index, total
                    ));
                }
                DeliveryStatus::Failed | DeliveryStatus::Skipped => {
                    reporter.progress(format!("slot {} failed ({}/{})", slot, index, total));
                }
            }
            outcomes.push(WindowOutcome {
                slot,
                window,
                status,
            });

            pause(self.timings.after_window());
        }

        let delivered = outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Delivered)
            .count();
        info!(
            action = %label,
            delivered = delivered,
            total = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Broadcast complete"
        );
        outcomes
    }

    fn deliver(&self, action: &Action, window: WindowHandle, first: bool) -> DeliveryStatus {
        if let Action::Click(point) = action {
            return match self.platform.post_click(window, *point) {
                Ok(()) => DeliveryStatus::Delivered,
                Err(e) => {
                    debug!(window = %window, error = %e, "Click delivery failed");
                    DeliveryStatus::Failed
                }
            };
        }

        // Injected keys go to whatever holds focus
        if !self.activator.bring_to_front(window, true) {
            warn!(window = %window, "Focused raise failed, nothing sent");
            return DeliveryStatus::Failed;
        }
        pause(self.timings.window_settle(first));

        if let Action::SendText { .. } = action
            && !self.confirm_focus(window)
        {
            warn!(window = %window, "Window never took focus, text not sent");
            return DeliveryStatus::FocusFailed;
        }

        match self.send_keys(action) {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                debug!(window = %window, error = %e, "Key injection failed");
                DeliveryStatus::Failed
            }
        }
    }

    fn send_keys(&self, action: &Action) -> anyhow::Result<()> {
        let ctrl = Some(Key::Control);
        match action {
            Action::Navigate { new_tab, .. } => {
                if *new_tab {
                    self.chord(ctrl, Key::Char('t'))?;
                    pause(self.timings.new_tab_settle());
                }
                self.chord(ctrl, Key::Char('l'))?;
                pause(self.timings.address_bar_settle());
                self.chord(ctrl, Key::Char('v'))?;
                pause(self.timings.paste_settle());
                self.chord(None, Key::Return)
            }
            Action::Shortcut(shortcut) => {
                let (modifier, key) = shortcut.chord();
                self.chord(modifier, key)
            }
            Action::SendText { with_enter, .. } => {
                self.chord(ctrl, Key::Char('v'))?;
                pause(self.timings.paste_settle());
                if *with_enter {
                    self.chord(None, Key::Return)?;
                }
                Ok(())
            }
            Action::DevTools => {
                self.chord(None, Key::Function(12))?;
                pause(self.timings.devtools_settle());
                Ok(())
            }
            Action::Click(_) => Ok(()),
        }
    }

    /// modifier down, key down, key up, modifier up. The modifier is released
    /// even if the key itself fails.
    fn chord(&self, modifier: Option<Key>, key: Key) -> anyhow::Result<()> {
        if let Some(modifier) = modifier {
            self.platform.key(modifier, true)?;
        }

        let tapped = self.tap(key);

        if let Some(modifier) = modifier {
            let released = self.platform.key(modifier, false);
            tapped?;
            released?;
            return Ok(());
        }
        tapped
    }

    fn tap(&self, key: Key) -> anyhow::Result<()> {
        self.platform.key(key, true)?;
        pause(self.timings.key_hold());
        self.platform.key(key, false)
    }

    /// Poll for the window to own the input focus, re-raising between attempts
    fn confirm_focus(&self, window: WindowHandle) -> bool {
        let attempts = self.timings.focus_confirm_attempts.max(1);
        for attempt in 1..=attempts {
            if attempt > 1 {
                self.activator.bring_to_front(window, true);
            }

            let deadline = Instant::now() + self.timings.focus_confirm_timeout();
            loop {
                match self.platform.foreground() {
                    Ok(Some(active)) if active == window => return true,
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "Foreground query failed"),
                }
                if Instant::now() >= deadline {
                    break;
                }
                pause(self.timings.focus_poll());
            }
            debug!(window = %window, attempt = attempt, "Focus not confirmed");
        }
        false
    }

    fn stage_clipboard(&self, text: &str) -> bool {
        let attempts = self.timings.clipboard_attempts.max(1);
        for attempt in 1..=attempts {
            match self.platform.set_text(text) {
                Ok(()) => return true,
                Err(e) => {
                    debug!(attempt = attempt, error = %e, "Clipboard write failed");
                    if attempt < attempts {
                        pause(self.timings.clipboard_retry());
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::events::RecordingReporter;
    use crate::common::types::Rect;
    use crate::fleet::registry::WindowRegistry;
    use crate::platform::fake::{FakePlatform, Op};
    use crate::platform::WindowSystem;

    fn slot(id: u32) -> SlotId {
        SlotId::new(id).unwrap()
    }

    fn handle(id: u32) -> WindowHandle {
        WindowHandle(0x0100_0000 + id)
    }

    /// Fleet with one window per slot, each at its own spot
    fn fleet(slots: &[u32]) -> (Arc<FakePlatform>, InputBroadcaster, RegistrySnapshot) {
        let platform = Arc::new(FakePlatform::new());
        let mut registry = WindowRegistry::new();
        for &id in slots {
            platform.add_window(handle(id), Rect::new(id as i32 * 10, 0, 400, 300));
            registry.bind(slot(id), handle(id));
        }
        let timings = Timings::instant();
        let activator = WindowActivator::new(platform.clone(), timings.clone(), None);
        let broadcaster = InputBroadcaster::new(platform.clone(), activator, timings);
        (platform, broadcaster, registry.snapshot())
    }

    fn finished(reporter: &RecordingReporter) -> usize {
        reporter
            .events()
            .iter()
            .filter(|e| **e == FleetEvent::Finished(WorkerKind::Broadcast))
            .count()
    }

    /// Keys sent to `window` after its last focused raise finished
    fn keys_after_focus(ops: &[Op], window: WindowHandle) -> Vec<(Key, bool)> {
        let focus = ops.iter().rposition(|op| *op == Op::Focus(window)).unwrap();
        // Every focused raise ends by releasing the modifiers, Super last
        let released = focus
            + ops[focus..]
                .iter()
                .position(|op| *op == Op::Key(Key::Super, false))
                .unwrap();
        ops[released + 1..]
            .iter()
            .take_while(|op| !matches!(op, Op::Focus(_)))
            .filter_map(|op| match op {
                Op::Key(key, pressed) => Some((*key, *pressed)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_registry_yields_only_completion() {
        let (platform, broadcaster, snapshot) = fleet(&[]);
        let reporter = RecordingReporter::new();

        let outcomes = broadcaster.broadcast(&Action::DevTools, &snapshot, &reporter);
        assert!(outcomes.is_empty());
        assert_eq!(reporter.events(), vec![FleetEvent::Finished(WorkerKind::Broadcast)]);
        assert!(platform.ops().is_empty());
    }

    #[test]
    fn test_invalidated_window_skipped_rest_continue() {
        let (platform, broadcaster, snapshot) = fleet(&[1, 2, 3]);
        platform.destroy_window(handle(2));
        let reporter = RecordingReporter::new();

        let outcomes = broadcaster.broadcast(
            &Action::Shortcut(Shortcut::Reload),
            &snapshot,
            &reporter,
        );
        let statuses: Vec<DeliveryStatus> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                DeliveryStatus::Delivered,
                DeliveryStatus::Skipped,
                DeliveryStatus::Delivered
            ]
        );
        assert_eq!(
            reporter.progress_lines(),
            vec!["f5 (1/3)", "slot 2 skipped (2/3)", "f5 (3/3)"]
        );
        assert_eq!(finished(&reporter), 1);
    }

    #[test]
    fn test_failed_activation_sends_no_keys() {
        let (platform, broadcaster, snapshot) = fleet(&[1, 2]);
        platform.reject_activation(handle(2));
        let reporter = RecordingReporter::new();

        let outcomes = broadcaster.broadcast(
            &Action::Shortcut(Shortcut::CloseTab),
            &snapshot,
            &reporter,
        );
        let statuses: Vec<DeliveryStatus> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![DeliveryStatus::Delivered, DeliveryStatus::Failed]
        );
        assert_eq!(
            reporter.progress_lines(),
            vec!["ctrl+w (1/2)", "slot 2 failed (2/2)"]
        );

        let w_presses = platform
            .key_events()
            .into_iter()
            .filter(|event| *event == (Key::Char('w'), true))
            .count();
        assert_eq!(w_presses, 1);
        assert_eq!(platform.foreground().unwrap(), Some(handle(1)));
        assert_eq!(finished(&reporter), 1);
    }

    #[test]
    fn test_navigate_stages_clipboard_once() {
        let (platform, broadcaster, snapshot) = fleet(&[4, 9]);
        let reporter = RecordingReporter::new();
        let action = Action::Navigate {
            url: "https://example.com".to_string(),
            new_tab: false,
        };

        broadcaster.broadcast(&action, &snapshot, &reporter);

        let staged: Vec<Op> = platform
            .ops()
            .into_iter()
            .filter(|op| matches!(op, Op::Clipboard(_)))
            .collect();
        assert_eq!(staged, vec![Op::Clipboard("https://example.com".to_string())]);

        let ops = platform.ops();
        let expected = vec![
            (Key::Control, true),
            (Key::Char('l'), true),
            (Key::Char('l'), false),
            (Key::Control, false),
            (Key::Control, true),
            (Key::Char('v'), true),
            (Key::Char('v'), false),
            (Key::Control, false),
            (Key::Return, true),
            (Key::Return, false),
        ];
        assert_eq!(keys_after_focus(&ops, handle(9)), expected);
    }

    #[test]
    fn test_navigate_in_new_tab_opens_tab_first() {
        let (platform, broadcaster, snapshot) = fleet(&[1]);
        let action = Action::Navigate {
            url: "https://example.com".to_string(),
            new_tab: true,
        };
        broadcaster.broadcast(&action, &snapshot, &RecordingReporter::new());

        let keys = keys_after_focus(&platform.ops(), handle(1));
        assert_eq!(&keys[..4], &[
            (Key::Control, true),
            (Key::Char('t'), true),
            (Key::Char('t'), false),
            (Key::Control, false),
        ]);
    }

    #[test]
    fn test_clipboard_retried_then_aborts() {
        let (platform, broadcaster, snapshot) = fleet(&[1, 2]);
        platform.fail_clipboard(3);
        let reporter = RecordingReporter::new();

        let outcomes = broadcaster.broadcast(
            &Action::SendText {
                text: "hello".to_string(),
                with_enter: false,
            },
            &snapshot,
            &reporter,
        );
        assert!(outcomes.iter().all(|o| o.status == DeliveryStatus::Failed));
        assert!(platform.key_events().is_empty());
        assert_eq!(finished(&reporter), 1);
    }

    #[test]
    fn test_clipboard_succeeds_on_third_attempt() {
        let (platform, broadcaster, snapshot) = fleet(&[1]);
        platform.fail_clipboard(2);

        let outcomes = broadcaster.broadcast(
            &Action::SendText {
                text: "hello".to_string(),
                with_enter: true,
            },
            &snapshot,
            &RecordingReporter::new(),
        );
        assert_eq!(outcomes[0].status, DeliveryStatus::Delivered);
        assert!(platform.key_events().contains(&(Key::Return, true)));
    }

    #[test]
    fn test_text_not_sent_when_focus_refused() {
        let (platform, broadcaster, snapshot) = fleet(&[1, 2]);
        platform.refuse_focus(handle(1));
        let reporter = RecordingReporter::new();

        let outcomes = broadcaster.broadcast(
            &Action::SendText {
                text: "hello".to_string(),
                with_enter: false,
            },
            &snapshot,
            &reporter,
        );
        assert_eq!(outcomes[0].status, DeliveryStatus::FocusFailed);
        assert_eq!(outcomes[1].status, DeliveryStatus::Delivered);

        // Three attempts: the initial raise plus two re-raises
        let focus_requests = platform
            .ops()
            .into_iter()
            .filter(|op| *op == Op::Focus(handle(1)))
            .count();
        assert_eq!(focus_requests, 3);
        assert!(keys_after_focus(&platform.ops(), handle(1)).is_empty());
        assert_eq!(
            reporter.progress_lines()[0],
            "slot 1 did not take focus (1/2)"
        );
    }

    #[test]
    fn test_shortcut_chord_order() {
        let (platform, broadcaster, snapshot) = fleet(&[5]);
        broadcaster.broadcast(
            &Action::Shortcut(Shortcut::CloseTab),
            &snapshot,
            &RecordingReporter::new(),
        );
        assert_eq!(
            keys_after_focus(&platform.ops(), handle(5)),
            vec![
                (Key::Control, true),
                (Key::Char('w'), true),
                (Key::Char('w'), false),
                (Key::Control, false),
            ]
        );
    }

    #[test]
    fn test_click_needs_no_focus() {
        let (platform, broadcaster, snapshot) = fleet(&[3, 7]);
        let reporter = RecordingReporter::new();

        let outcomes = broadcaster.broadcast(
            &Action::Click(Point::new(120, 40)),
            &snapshot,
            &reporter,
        );
        assert!(outcomes.iter().all(|o| o.status == DeliveryStatus::Delivered));
        assert_eq!(
            platform.clicks(),
            vec![
                (handle(3), Point::new(120, 40)),
                (handle(7), Point::new(120, 40))
            ]
        );
        assert!(!platform.ops().iter().any(|op| matches!(op, Op::Focus(_))));
        assert_eq!(reporter.progress_lines().len(), 2);
    }
}
