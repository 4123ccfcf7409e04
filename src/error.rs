use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the launcher.
///
/// None of these stop the launcher outright: the supervisor turns them into
/// banner lines on the output channel.
#[derive(Debug, Error)]
pub enum Error {
    /// The log file for the run could not be created.
    #[error("failed to create log file {}: {source}", path.display())]
    LogOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The child process could not be spawned.
    #[error("{0}")]
    Spawn(#[source] io::Error),

    /// The supervisor already launched its one child.
    #[error("a process was already started by this supervisor")]
    AlreadyStarted,
}

impl Error {
    /// The underlying OS error message, as shown to the user.
    pub fn os_message(&self) -> String {
        match self {
            Error::LogOpen { source, .. } => source.to_string(),
            Error::Spawn(source) => source.to_string(),
            Error::AlreadyStarted => self.to_string(),
        }
    }
}
