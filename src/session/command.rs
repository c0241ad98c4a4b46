//! Operator commands typed into the session

use anyhow::{Result, anyhow, bail};

use crate::common::types::{SlotId, parse_slot_list};
use crate::fleet::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Launch(Vec<SlotId>),
    Broadcast(Action),
    /// Raise one slot; `focus: false` only restacks it
    Activate { slot: SlotId, focus: bool },
    ActivateAll,
    MinimizeAll,
    Close(SlotId),
    CloseAll,
    Status,
    Help,
    Quit { close: bool },
}

pub const HELP: &str = "\
commands:
  launch <slots...>      open and arrange slots (e.g. `launch 1-8 12`)
  url <url>              open a URL in every window
  tab <url>              open a URL in a new tab in every window
  key <ctrl+t|ctrl+w|f5> send a shortcut to every window
  text [--enter] <text>  paste text into every window
  devtools               toggle developer tools in every window
  activate <slot>        bring one window to the front with focus
  peek <slot>            raise one window without focusing it
  activate-all           bring every window to the front
  minimize-all           minimize every window
  close <slot>           close one window
  close-all              close every window
  status                 show managed slots
  quit [--close]         leave (optionally closing every window)
click capture: press the arm key, then click inside a managed window";

impl Command {
    /// `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "launch" | "open" => {
                let slots = parse_slot_list(rest.split_whitespace())?;
                if slots.is_empty() {
                    bail!("launch needs at least one slot");
                }
                Command::Launch(slots)
            }
            "url" | "tab" => {
                if rest.is_empty() {
                    bail!("{} needs a URL", word);
                }
                Command::Broadcast(Action::Navigate {
                    url: rest.to_string(),
                    new_tab: word.eq_ignore_ascii_case("tab"),
                })
            }
            "key" => Command::Broadcast(Action::Shortcut(rest.parse()?)),
            "text" => {
                let (with_enter, text) = match rest.strip_prefix("--enter") {
                    Some(text) if text.is_empty() || text.starts_with(char::is_whitespace) => {
                        (true, text.trim_start())
                    }
                    _ => (false, rest),
                };
                if text.is_empty() {
                    bail!("text needs something to type");
                }
                Command::Broadcast(Action::SendText {
                    text: text.to_string(),
                    with_enter,
                })
            }
            "devtools" => Command::Broadcast(Action::DevTools),
            "activate" => Command::Activate {
                slot: single_slot(word, rest)?,
                focus: true,
            },
            "peek" => Command::Activate {
                slot: single_slot(word, rest)?,
                focus: false,
            },
            "activate-all" => Command::ActivateAll,
            "minimize-all" => Command::MinimizeAll,
            "close" => Command::Close(single_slot(word, rest)?),
            "close-all" => Command::CloseAll,
            "status" | "ls" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => match rest {
                "" => Command::Quit { close: false },
                "--close" => Command::Quit { close: true },
                other => bail!("unexpected argument '{}' to quit", other),
            },
            other => bail!("unknown command '{}' (try `help`)", other),
        };
        Ok(Some(command))
    }
}

fn single_slot(word: &str, rest: &str) -> Result<SlotId> {
    if rest.is_empty() {
        return Err(anyhow!("{} needs a slot", word));
    }
    rest.parse()
}
