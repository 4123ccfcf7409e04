//! Run a command-line program hidden in the background while keeping its output.
//!
//! The launcher spawns one child with its standard output and standard error piped,
//! funnels every line through a single [`OutputRouter`] to a live display and a log
//! file, and lets the window be parked and restored while the child runs. Closing the
//! launcher kills a running child first, so it is never left behind.
//!
//! ```no_run
//! # use bgrunner::*;
//! # fn dummy() -> std::io::Result<()> {
//! # #[derive(Default)] struct Screen;
//! # impl DisplaySink for Screen {
//! #     fn on_line(&mut self, _: &str) {}
//! #     fn on_title_changed(&mut self, _: &str) {}
//! # }
//! let router = OutputRouter::new(Screen::default())?;
//! let supervisor = ProcessSupervisor::new(router.handle(), Config::from_env());
//! let spec = LaunchSpec::from_args(["python", "server.py", "--port", "8000"]);
//! supervisor.start(&spec).ok();
//! supervisor.wait();
//! router.shutdown();
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations)]

mod config;
mod error;
mod process;
mod resolve;
mod router;
mod sink;
mod spawn;
mod supervisor;
mod visibility;

pub mod console;

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod win32;

#[cfg(test)]
mod tests;

pub use config::{Config, LOG_DIR_VAR, NO_LOG_VAR};
pub use error::{Error, Result};
pub use process::{ExitStatus, Process};
pub use resolve::{APP_NAME, LOG_FILE_PREFIX, LaunchSpec};
pub use router::{DisplaySink, OutputLine, OutputRouter, RouterHandle, StreamKind};
pub use sink::LogSink;
pub use supervisor::{
    ChildControl, GRACE_PERIOD, Phase, ProcessSupervisor, USAGE, banner, exit_banner,
};
pub use visibility::{CloseDecision, Visibility, VisibilityController, WindowHost};
