//! Scripted in-memory platform for exercising the fleet core in tests

use anyhow::{Result, anyhow, bail};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::{Clipboard, DisplaySource, InputInjector, KeyState, ProcessLauncher, WindowSystem};
use crate::common::types::{DisplayInfo, Key, Point, Rect, SlotId, WindowHandle};
use crate::fleet::launch::LaunchRequest;

/// Every side effect the core asked for, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Spawn(SlotId),
    Move(WindowHandle, Rect),
    Raise(WindowHandle),
    Focus(WindowHandle),
    Restore(WindowHandle),
    Show(WindowHandle),
    Minimize(WindowHandle),
    Close(WindowHandle),
    Key(Key, bool),
    Click(WindowHandle, Point),
    Clipboard(String),
}

#[derive(Debug, Clone)]
struct FakeWindow {
    bounds: Rect,
    minimized: bool,
}

#[derive(Default)]
struct FakeState {
    displays: Vec<DisplayInfo>,
    windows: BTreeMap<WindowHandle, FakeWindow>,
    /// Enumeration order (creation order)
    order: Vec<WindowHandle>,
    /// Stacking order, bottom to top
    stacking: Vec<WindowHandle>,
    /// Windows that appear after the next spawns: (handle, polls until visible)
    on_spawn: VecDeque<(WindowHandle, usize)>,
    pending: Vec<(WindowHandle, usize)>,
    failing_spawns: HashSet<SlotId>,
    foreground: Option<WindowHandle>,
    refuses_focus: HashSet<WindowHandle>,
    rejects_activation: HashSet<WindowHandle>,
    keys_down: HashSet<Key>,
    stuck_keys: HashSet<Key>,
    left_down: bool,
    cursor: Point,
    clipboard_failures: u32,
    /// Offset the "window manager" applies to the first move of each window
    first_move_drift: Option<(i32, i32)>,
    drifted: HashSet<WindowHandle>,
    ops: Vec<Op>,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_displays(self, displays: Vec<DisplayInfo>) -> Self {
        self.state().displays = displays;
        self
    }

    /// Add an already-visible browser window
    pub fn add_window(&self, handle: WindowHandle, bounds: Rect) {
        let mut state = self.state();
        state.windows.insert(
            handle,
            FakeWindow {
                bounds,
                minimized: false,
            },
        );
        state.order.push(handle);
        state.stacking.push(handle);
    }

    /// The next spawn makes `handle` appear after `polls` window enumerations
    pub fn window_on_next_spawn(&self, handle: WindowHandle, polls: usize) {
        self.state().on_spawn.push_back((handle, polls));
    }

    pub fn fail_spawn(&self, slot: SlotId) {
        self.state().failing_spawns.insert(slot);
    }

    /// Simulate the window being destroyed
    pub fn destroy_window(&self, handle: WindowHandle) {
        let mut state = self.state();
        state.windows.remove(&handle);
        state.order.retain(|&w| w != handle);
        state.stacking.retain(|&w| w != handle);
        if state.foreground == Some(handle) {
            state.foreground = None;
        }
    }

    pub fn set_minimized(&self, handle: WindowHandle, minimized: bool) {
        if let Some(window) = self.state().windows.get_mut(&handle) {
            window.minimized = minimized;
        }
    }

    pub fn refuse_focus(&self, handle: WindowHandle) {
        self.state().refuses_focus.insert(handle);
    }

    /// Activation requests for `handle` error out
    pub fn reject_activation(&self, handle: WindowHandle) {
        self.state().rejects_activation.insert(handle);
    }

    pub fn set_foreground(&self, handle: Option<WindowHandle>) {
        self.state().foreground = handle;
    }

    pub fn set_key_down(&self, key: Key, down: bool) {
        let mut state = self.state();
        if down {
            state.keys_down.insert(key);
        } else {
            state.keys_down.remove(&key);
        }
    }

    /// Key stays logically down even after a synthetic release
    pub fn stick_key(&self, key: Key) {
        let mut state = self.state();
        state.keys_down.insert(key);
        state.stuck_keys.insert(key);
    }

    pub fn set_pointer(&self, cursor: Point, left_down: bool) {
        let mut state = self.state();
        state.cursor = cursor;
        state.left_down = left_down;
    }

    pub fn fail_clipboard(&self, times: u32) {
        self.state().clipboard_failures = times;
    }

    pub fn drift_first_move(&self, dx: i32, dy: i32) {
        self.state().first_move_drift = Some((dx, dy));
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state().ops.clear();
    }

    pub fn window_bounds(&self, handle: WindowHandle) -> Option<Rect> {
        self.state().windows.get(&handle).map(|w| w.bounds)
    }

    pub fn spawned(&self) -> Vec<SlotId> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Spawn(slot) => Some(*slot),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<(WindowHandle, Point)> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Click(window, point) => Some((*window, *point)),
                _ => None,
            })
            .collect()
    }

    pub fn key_events(&self) -> Vec<(Key, bool)> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Key(key, pressed) => Some((*key, *pressed)),
                _ => None,
            })
            .collect()
    }

    fn require(state: &FakeState, window: WindowHandle) -> Result<()> {
        if state.windows.contains_key(&window) {
            Ok(())
        } else {
            Err(anyhow!("BadWindow {}", window))
        }
    }
}

impl DisplaySource for FakePlatform {
    fn displays(&self) -> Result<Vec<DisplayInfo>> {
        Ok(self.state().displays.clone())
    }
}

impl WindowSystem for FakePlatform {
    fn app_windows(&self) -> Result<Vec<WindowHandle>> {
        let mut state = self.state();

        let mut appeared = Vec::new();
        for (handle, polls) in state.pending.iter_mut() {
            if *polls <= 1 {
                appeared.push(*handle);
            } else {
                *polls -= 1;
            }
        }
        state.pending.retain(|(handle, _)| !appeared.contains(handle));
        for handle in appeared {
            state.windows.insert(
                handle,
                FakeWindow {
                    bounds: Rect::new(0, 0, 800, 600),
                    minimized: false,
                },
            );
            state.order.push(handle);
            state.stacking.push(handle);
        }

        Ok(state.order.clone())
    }

    fn is_valid(&self, window: WindowHandle) -> bool {
        self.state().windows.contains_key(&window)
    }

    fn is_minimized(&self, window: WindowHandle) -> Result<bool> {
        let state = self.state();
        state
            .windows
            .get(&window)
            .map(|w| w.minimized)
            .ok_or_else(|| anyhow!("BadWindow {}", window))
    }

    fn restore(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        if let Some(w) = state.windows.get_mut(&window) {
            w.minimized = false;
        }
        state.ops.push(Op::Restore(window));
        Ok(())
    }

    fn move_resize(&self, window: WindowHandle, rect: Rect) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;

        let mut placed = rect;
        if let Some((dx, dy)) = state.first_move_drift
            && state.drifted.insert(window)
        {
            placed.x += dx;
            placed.y += dy;
        }
        if let Some(w) = state.windows.get_mut(&window) {
            w.bounds = placed;
        }
        state.ops.push(Op::Move(window, rect));
        Ok(())
    }

    fn bounds(&self, window: WindowHandle) -> Result<Rect> {
        let state = self.state();
        state
            .windows
            .get(&window)
            .map(|w| w.bounds)
            .ok_or_else(|| anyhow!("BadWindow {}", window))
    }

    fn raise(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        state.stacking.retain(|&w| w != window);
        state.stacking.push(window);
        state.ops.push(Op::Raise(window));
        Ok(())
    }

    fn raise_with_focus(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        if state.rejects_activation.contains(&window) {
            return Err(anyhow!("activation of {} rejected", window));
        }
        state.stacking.retain(|&w| w != window);
        state.stacking.push(window);
        if !state.refuses_focus.contains(&window) {
            state.foreground = Some(window);
        }
        state.ops.push(Op::Focus(window));
        Ok(())
    }

    fn show(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        state.ops.push(Op::Show(window));
        Ok(())
    }

    fn foreground(&self) -> Result<Option<WindowHandle>> {
        Ok(self.state().foreground)
    }

    fn toplevel_at(&self, point: Point) -> Result<Option<WindowHandle>> {
        let state = self.state();
        Ok(state
            .stacking
            .iter()
            .rev()
            .copied()
            .find(|handle| {
                state
                    .windows
                    .get(handle)
                    .is_some_and(|w| !w.minimized && w.bounds.contains(point))
            }))
    }

    fn screen_to_client(&self, window: WindowHandle, point: Point) -> Result<Point> {
        let bounds = self.bounds(window)?;
        Ok(Point::new(point.x - bounds.x, point.y - bounds.y))
    }

    fn close(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        state.ops.push(Op::Close(window));
        Ok(())
    }

    fn minimize(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        if let Some(w) = state.windows.get_mut(&window) {
            w.minimized = true;
        }
        state.ops.push(Op::Minimize(window));
        Ok(())
    }
}

impl ProcessLauncher for FakePlatform {
    fn spawn_instance(&self, request: &LaunchRequest) -> Result<()> {
        let mut state = self.state();
        state.ops.push(Op::Spawn(request.slot));
        if state.failing_spawns.contains(&request.slot) {
            bail!("executable not found");
        }
        if let Some(next) = state.on_spawn.pop_front() {
            state.pending.push(next);
        }
        Ok(())
    }
}

impl KeyState for FakePlatform {
    fn is_key_down(&self, key: Key) -> Result<bool> {
        Ok(self.state().keys_down.contains(&key))
    }

    fn is_left_button_down(&self) -> Result<bool> {
        Ok(self.state().left_down)
    }

    fn cursor_position(&self) -> Result<Point> {
        Ok(self.state().cursor)
    }
}

impl Clipboard for FakePlatform {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut state = self.state();
        if state.clipboard_failures > 0 {
            state.clipboard_failures -= 1;
            bail!("clipboard busy");
        }
        state.ops.push(Op::Clipboard(text.to_string()));
        Ok(())
    }
}

impl InputInjector for FakePlatform {
    fn key(&self, key: Key, pressed: bool) -> Result<()> {
        let mut state = self.state();
        if pressed {
            state.keys_down.insert(key);
        } else if !state.stuck_keys.contains(&key) {
            state.keys_down.remove(&key);
        }
        state.ops.push(Op::Key(key, pressed));
        Ok(())
    }

    fn post_click(&self, window: WindowHandle, point: Point) -> Result<()> {
        let mut state = self.state();
        Self::require(&state, window)?;
        state.ops.push(Op::Click(window, point));
        Ok(())
    }
}
