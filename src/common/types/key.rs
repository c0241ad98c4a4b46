//! Virtual keys and named browser shortcuts
//!
//! Keys serialize to/from short lowercase names ("ctrl", "f8", "t") so the
//! config file stays hand-editable.

use anyhow::{Result, bail};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::common::constants::keysym;

/// A key the fleet can press, release or watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Control,
    Shift,
    Alt,
    Super,
    Return,
    Escape,
    Tab,
    /// Function key F1..=F12
    Function(u8),
    /// Printable ASCII key, stored lowercase
    Char(char),
}

impl Key {
    /// Modifiers that must never be left logically pressed after a focus change
    pub const MODIFIERS: [Key; 4] = [Key::Control, Key::Alt, Key::Shift, Key::Super];

    pub fn is_modifier(self) -> bool {
        Self::MODIFIERS.contains(&self)
    }

    /// X11 keysym for this key
    pub fn keysym(self) -> u32 {
        match self {
            Key::Control => keysym::CONTROL_L,
            Key::Shift => keysym::SHIFT_L,
            Key::Alt => keysym::ALT_L,
            Key::Super => keysym::SUPER_L,
            Key::Return => keysym::RETURN,
            Key::Escape => keysym::ESCAPE,
            Key::Tab => keysym::TAB,
            Key::Function(n) => keysym::F1 + u32::from(n.saturating_sub(1)),
            // Latin-1 keysyms equal their code points
            Key::Char(c) => c as u32,
        }
    }

    pub fn name(self) -> String {
        match self {
            Key::Control => "ctrl".to_string(),
            Key::Shift => "shift".to_string(),
            Key::Alt => "alt".to_string(),
            Key::Super => "super".to_string(),
            Key::Return => "enter".to_string(),
            Key::Escape => "escape".to_string(),
            Key::Tab => "tab".to_string(),
            Key::Function(n) => format!("f{}", n),
            Key::Char(c) => c.to_string(),
        }
    }
}

impl FromStr for Key {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let key = match lower.as_str() {
            "ctrl" | "control" => Key::Control,
            "shift" => Key::Shift,
            "alt" | "menu" => Key::Alt,
            "super" | "meta" | "win" => Key::Super,
            "enter" | "return" => Key::Return,
            "esc" | "escape" => Key::Escape,
            "tab" => Key::Tab,
            other => {
                if let Some(n) = other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    if !(1..=12).contains(&n) {
                        bail!("function key out of range: '{}'", s);
                    }
                    Key::Function(n)
                } else {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) if c.is_ascii_graphic() => Key::Char(c),
                        _ => bail!("unknown key name '{}'", s),
                    }
                }
            }
        };
        Ok(key)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Key::from_str(&name).map_err(de::Error::custom)
    }
}

/// Fixed browser shortcuts that can be broadcast by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    NewTab,
    CloseTab,
    Reload,
}

impl Shortcut {
    /// (modifier, key) pair pressed in order and released in reverse
    pub fn chord(self) -> (Option<Key>, Key) {
        match self {
            Shortcut::NewTab => (Some(Key::Control), Key::Char('t')),
            Shortcut::CloseTab => (Some(Key::Control), Key::Char('w')),
            Shortcut::Reload => (None, Key::Function(5)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Shortcut::NewTab => "ctrl+t",
            Shortcut::CloseTab => "ctrl+w",
            Shortcut::Reload => "f5",
        }
    }
}

impl FromStr for Shortcut {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctrl+t" | "new-tab" => Ok(Shortcut::NewTab),
            "ctrl+w" | "close-tab" => Ok(Shortcut::CloseTab),
            "f5" | "reload" => Ok(Shortcut::Reload),
            other => bail!("unknown shortcut '{}' (expected ctrl+t, ctrl+w or f5)", other),
        }
    }
}

impl std::fmt::Display for Shortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_keys() {
        assert_eq!("Ctrl".parse::<Key>().unwrap(), Key::Control);
        assert_eq!("ESC".parse::<Key>().unwrap(), Key::Escape);
        assert_eq!("f8".parse::<Key>().unwrap(), Key::Function(8));
        assert_eq!("T".parse::<Key>().unwrap(), Key::Char('t'));
        assert!("f13".parse::<Key>().is_err());
        assert!("hyper".parse::<Key>().is_err());
    }

    #[test]
    fn test_keysyms() {
        assert_eq!(Key::Function(5).keysym(), 0xffc2);
        assert_eq!(Key::Function(12).keysym(), 0xffc9);
        assert_eq!(Key::Char('l').keysym(), 0x6c);
        assert_eq!(Key::Control.keysym(), 0xffe3);
    }

    #[test]
    fn test_key_serde_uses_names() {
        let json = serde_json::to_string(&Key::Function(8)).unwrap();
        assert_eq!(json, "\"f8\"");
        let key: Key = serde_json::from_str("\"escape\"").unwrap();
        assert_eq!(key, Key::Escape);
        assert!(serde_json::from_str::<Key>("\"nope\"").is_err());
    }

    #[test]
    fn test_shortcut_chords() {
        assert_eq!(
            "ctrl+t".parse::<Shortcut>().unwrap().chord(),
            (Some(Key::Control), Key::Char('t'))
        );
        assert_eq!("reload".parse::<Shortcut>().unwrap(), Shortcut::Reload);
        assert_eq!(Shortcut::Reload.chord(), (None, Key::Function(5)));
        assert!("ctrl+q".parse::<Shortcut>().is_err());
    }

    #[test]
    fn test_modifier_classification() {
        assert!(Key::Alt.is_modifier());
        assert!(!Key::Return.is_modifier());
    }
}
