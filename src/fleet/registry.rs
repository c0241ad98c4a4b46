//! Slot to window bindings
//!
//! The registry has exactly one owner (the session loop). Everyone else reads
//! immutable [`RegistrySnapshot`]s, either handed over when a worker starts or
//! pulled from a [`RegistryView`] that follows every mutation.

use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::common::events::FleetEvent;
use crate::common::types::{SlotId, WindowHandle};
use crate::platform::WindowSystem;

/// Point-in-time copy of the registry, ordered by slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    entries: BTreeMap<SlotId, WindowHandle>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WindowHandle)> + '_ {
        self.entries.iter().map(|(&slot, &window)| (slot, window))
    }

    pub fn window(&self, slot: SlotId) -> Option<WindowHandle> {
        self.entries.get(&slot).copied()
    }

    pub fn slot_of(&self, window: WindowHandle) -> Option<SlotId> {
        self.iter().find(|&(_, w)| w == window).map(|(slot, _)| slot)
    }

    pub fn slots(&self) -> Vec<SlotId> {
        self.entries.keys().copied().collect()
    }

    pub fn windows(&self) -> Vec<WindowHandle> {
        self.entries.values().copied().collect()
    }

    /// Entries whose window no longer exists or is no longer visible
    pub fn stale<W: WindowSystem + ?Sized>(&self, windows: &W) -> Vec<(SlotId, WindowHandle)> {
        self.iter()
            .filter(|&(_, window)| !windows.is_valid(window))
            .collect()
    }
}

/// Read-only handle following the registry
#[derive(Debug, Clone)]
pub struct RegistryView {
    rx: watch::Receiver<RegistrySnapshot>,
}

impl RegistryView {
    pub fn current(&self) -> RegistrySnapshot {
        self.rx.borrow().clone()
    }
}

/// Single-writer slot registry
pub struct WindowRegistry {
    entries: BTreeMap<SlotId, WindowHandle>,
    tx: watch::Sender<RegistrySnapshot>,
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RegistrySnapshot::default());
        Self {
            entries: BTreeMap::new(),
            tx,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, slot: SlotId) -> Option<WindowHandle> {
        self.entries.get(&slot).copied()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self.entries.clone(),
        }
    }

    pub fn view(&self) -> RegistryView {
        RegistryView {
            rx: self.tx.subscribe(),
        }
    }

    /// Bind `slot` to `window`. A window belongs to at most one slot, so any
    /// other slot holding the same handle is unbound first.
    pub fn bind(&mut self, slot: SlotId, window: WindowHandle) {
        let previous_owner = self
            .entries
            .iter()
            .find(|&(&s, &w)| w == window && s != slot)
            .map(|(&s, _)| s);
        if let Some(other) = previous_owner {
            debug!(slot = %other, window = %window, "Unbinding window from previous slot");
            self.entries.remove(&other);
        }

        if let Some(old) = self.entries.insert(slot, window)
            && old != window
        {
            debug!(slot = %slot, old = %old, new = %window, "Slot rebound to new window");
        }
        info!(slot = %slot, window = %window, "Slot managed");
        self.publish();
    }

    pub fn evict(&mut self, slot: SlotId) -> Option<WindowHandle> {
        let removed = self.entries.remove(&slot);
        if let Some(window) = removed {
            info!(slot = %slot, window = %window, "Slot released");
            self.publish();
        }
        removed
    }

    /// Evict stale entries found by a survey. An entry is only evicted if the
    /// slot is still bound to the same window it was surveyed with.
    pub fn evict_stale(&mut self, stale: &[(SlotId, WindowHandle)]) -> Vec<SlotId> {
        let mut evicted = Vec::new();
        for &(slot, window) in stale {
            if self.entries.get(&slot) == Some(&window) {
                self.entries.remove(&slot);
                info!(slot = %slot, window = %window, "Window gone, slot released");
                evicted.push(slot);
            }
        }
        if !evicted.is_empty() {
            self.publish();
        }
        evicted
    }

    /// Apply an event from a worker; returns true if the registry changed
    pub fn apply(&mut self, event: &FleetEvent) -> bool {
        match event {
            FleetEvent::Managed { slot, window } => {
                if self.get(*slot) == Some(*window) {
                    return false;
                }
                self.bind(*slot, *window);
                true
            }
            _ => false,
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot());
    }
}
