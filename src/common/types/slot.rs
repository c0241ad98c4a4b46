//! Slot and window identities

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::common::constants::slots;

/// Operator-assigned identity of one browser-profile instance (1..=100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SlotId(u32);

impl SlotId {
    pub fn new(id: u32) -> Result<Self> {
        if !(slots::MIN..=slots::MAX).contains(&id) {
            bail!(
                "slot {} out of range ({}..={})",
                id,
                slots::MIN,
                slots::MAX
            );
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Every valid slot, ascending
    pub fn all() -> impl Iterator<Item = SlotId> {
        (slots::MIN..=slots::MAX).map(SlotId)
    }
}

impl TryFrom<u32> for SlotId {
    type Error = anyhow::Error;

    fn try_from(id: u32) -> Result<Self> {
        Self::new(id)
    }
}

impl From<SlotId> for u32 {
    fn from(slot: SlotId) -> Self {
        slot.0
    }
}

impl FromStr for SlotId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u32 = s
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid slot '{}'", s))?;
        Self::new(id)
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque OS handle of a top-level window (an X11 window id on this backend)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u32);

impl WindowHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Parse a slot list such as `"3 7 10-12"` or `"1,2,5"` into sorted, unique slots
pub fn parse_slot_list<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Vec<SlotId>> {
    let mut slots = Vec::new();
    for token in tokens
        .into_iter()
        .flat_map(|t| t.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if let Some((start, end)) = token.split_once('-') {
            let start: SlotId = start.parse()?;
            let end: SlotId = end.parse()?;
            if start > end {
                bail!("empty slot range '{}'", token);
            }
            slots.extend((start.get()..=end.get()).map(SlotId));
        } else {
            slots.push(token.parse()?);
        }
    }
    slots.sort_unstable();
    slots.dedup();
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_bounds() {
        assert!(SlotId::new(0).is_err());
        assert!(SlotId::new(1).is_ok());
        assert!(SlotId::new(100).is_ok());
        assert!(SlotId::new(101).is_err());
    }

    #[test]
    fn test_slot_all_covers_range() {
        let all: Vec<u32> = SlotId::all().map(SlotId::get).collect();
        assert_eq!(all.len(), 100);
        assert_eq!(all.first(), Some(&1));
        assert_eq!(all.last(), Some(&100));
    }

    #[test]
    fn test_slot_deserialize_rejects_out_of_range() {
        let ok: SlotId = serde_json::from_str("42").unwrap();
        assert_eq!(ok.get(), 42);
        assert!(serde_json::from_str::<SlotId>("0").is_err());
    }

    #[test]
    fn test_parse_slot_list_ranges_and_duplicates() {
        let slots = parse_slot_list(["9", "1-3,2", "50"]).unwrap();
        let ids: Vec<u32> = slots.into_iter().map(SlotId::get).collect();
        assert_eq!(ids, vec![1, 2, 3, 9, 50]);
    }

    #[test]
    fn test_parse_slot_list_errors() {
        assert!(parse_slot_list(["5-2"]).is_err());
        assert!(parse_slot_list(["abc"]).is_err());
        assert!(parse_slot_list(["99-101"]).is_err());
    }

    #[test]
    fn test_window_handle_display() {
        assert_eq!(WindowHandle(0x1c00003).to_string(), "0x01c00003");
    }
}
