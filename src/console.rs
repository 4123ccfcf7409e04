//! Terminal stand-ins for the window and tray.
//!
//! Output goes to stdout, the title to the terminal's title bar, and the
//! minimize/restore/close gestures arrive as words on stdin:
//!
//! ```text
//! hide | minimize     park the launcher
//! show | restore      bring it back
//! quit | exit | close kill the child (if running) and leave
//! ```

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::debug;

use crate::router::DisplaySink;
use crate::visibility::WindowHost;

/// Prints each line to stdout.
#[derive(Debug)]
pub struct ConsoleDisplay {
    set_title: bool,
}

impl ConsoleDisplay {
    pub fn new() -> ConsoleDisplay {
        ConsoleDisplay {
            set_title: io::stdout().is_terminal(),
        }
    }
}

impl Default for ConsoleDisplay {
    fn default() -> ConsoleDisplay {
        ConsoleDisplay::new()
    }
}

impl DisplaySink for ConsoleDisplay {
    fn on_line(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout is nothing to die over; the log still gets the line.
        writeln!(out, "{}", text).and_then(|_| out.flush()).ok();
    }

    fn on_title_changed(&mut self, title: &str) {
        if self.set_title {
            let mut out = io::stdout().lock();
            write!(out, "\x1b]0;{}\x07", title).and_then(|_| out.flush()).ok();
        }
    }
}

/// Reports visibility changes on stderr.
#[derive(Debug, Default)]
pub struct ConsoleWindow {
    hidden: bool,
}

impl ConsoleWindow {
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

impl WindowHost for ConsoleWindow {
    fn show_window(&mut self) {
        self.hidden = false;
        eprintln!("[bgrunner] restored");
    }

    fn hide_to_tray(&mut self) {
        self.hidden = true;
        eprintln!("[bgrunner] running in background, type `show` to restore");
    }
}

/// A gesture typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Minimize,
    Restore,
    Close,
}

impl ControlCommand {
    pub fn parse(line: &str) -> Option<ControlCommand> {
        match line.trim().to_ascii_lowercase().as_str() {
            "hide" | "minimize" => Some(ControlCommand::Minimize),
            "show" | "restore" => Some(ControlCommand::Restore),
            "quit" | "exit" | "close" => Some(ControlCommand::Close),
            _ => None,
        }
    }
}

/// Reads control commands from stdin on a background thread.
///
/// The channel disconnects when stdin reaches end of file.
pub fn start_stdin_listener() -> io::Result<Receiver<ControlCommand>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("bgrunner-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match ControlCommand::parse(&line) {
                    Some(command) => {
                        if sender.send(command).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => debug!(input = %line.trim(), "unknown command ignored"),
                }
            }
        })?;
    Ok(receiver)
}
