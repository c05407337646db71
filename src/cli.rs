//! Command-line interface and REPL
//!
//! Stands in for the host application: each line names a control and a
//! gesture, e.g. `cw volume 3` or `tap kick`.

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::actions::Gesture;
use crate::deck::Deck;

/// A parsed REPL line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deliver one gesture to a control
    Gesture { id: String, gesture: Gesture },
    /// Press then release
    Tap(String),
    /// Label of one control, or all of them
    Show(Option<String>),
    Ports,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let id = words.next().map(str::to_string);
        let count = words.next();

        let require_id = |id: Option<String>| id.ok_or_else(|| format!("'{}' needs a control id", verb));
        let detents = || -> Result<u32, String> {
            match count {
                None => Ok(1),
                Some(n) => n
                    .parse::<u32>()
                    .map_err(|_| format!("'{}' is not a number of detents", n)),
            }
        };

        let command = match verb {
            "press" | "p" => Command::Gesture {
                id: require_id(id)?,
                gesture: Gesture::Press,
            },
            "release" | "r" => Command::Gesture {
                id: require_id(id)?,
                gesture: Gesture::Release,
            },
            "tap" | "t" => Command::Tap(require_id(id)?),
            "cw" | "+" => Command::Gesture {
                id: require_id(id)?,
                gesture: Gesture::RotateCw(detents()?),
            },
            "ccw" | "-" => Command::Gesture {
                id: require_id(id)?,
                gesture: Gesture::RotateCcw(detents()?),
            },
            "show" | "ls" => Command::Show(id),
            "ports" => Command::Ports,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(command)
    }
}

/// Read lines on a dedicated thread and forward them to the runtime
///
/// The channel closes on EOF or Ctrl-C at the prompt, or when the receiver
/// goes away.
pub fn spawn_repl() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::Builder::new()
        .name("repl".to_string())
        .spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    warn!("Failed to start REPL: {}", e);
                    return;
                }
            };
            repl_loop(&mut rl, &tx);
        })?;

    Ok(rx)
}

fn repl_loop(rl: &mut DefaultEditor, tx: &mpsc::Sender<String>) {
    loop {
        match rl.readline("deck> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                debug!("REPL read failed: {}", e);
                break;
            }
        }
    }
}

pub fn print_help() {
    println!("\n{}", "Commands:".bold());
    println!("  {} <id>           press a control", "press".yellow());
    println!("  {} <id>         release a control", "release".yellow());
    println!("  {} <id>             press and release", "tap".yellow());
    println!("  {} <id> [n]          rotate a dial clockwise", "cw".yellow());
    println!("  {} <id> [n]         rotate a dial counter-clockwise", "ccw".yellow());
    println!("  {} [id]            show control labels", "show".yellow());
    println!("  {}                list MIDI outputs", "ports".yellow());
    println!("  {}                 leave", "quit".yellow());
    println!();
}

pub fn print_controls(deck: &Deck, only: Option<&str>) {
    for id in deck.ids().filter(|id| only.map_or(true, |only| only == *id)) {
        let kind = deck.action_type(id).map(|t| t.as_str()).unwrap_or("?");
        let label = deck.label(id).unwrap_or_default();
        println!("  {:<12} {:<8} {}", id.bright_white(), kind.dimmed(), label.cyan());
    }
}

pub fn print_ports(ports: &[String]) {
    println!("\n{}", "=== Available MIDI Outputs ===".bold().cyan());
    if ports.is_empty() {
        println!("  {}", "No output ports found".dimmed());
    } else {
        for port in ports {
            println!("  {}", port);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gestures() {
        assert_eq!(
            Command::parse("press kick"),
            Ok(Command::Gesture { id: "kick".into(), gesture: Gesture::Press })
        );
        assert_eq!(
            Command::parse("  cw volume 3 "),
            Ok(Command::Gesture { id: "volume".into(), gesture: Gesture::RotateCw(3) })
        );
        assert_eq!(
            Command::parse("ccw volume"),
            Ok(Command::Gesture { id: "volume".into(), gesture: Gesture::RotateCcw(1) })
        );
        assert_eq!(Command::parse("tap kick"), Ok(Command::Tap("kick".into())));
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(Command::parse("show"), Ok(Command::Show(None)));
        assert_eq!(Command::parse("show volume"), Ok(Command::Show(Some("volume".into()))));
        assert_eq!(Command::parse("ports"), Ok(Command::Ports));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("press").is_err());
        assert!(Command::parse("cw volume lots").is_err());
        assert!(Command::parse("jump kick").is_err());
    }
}
