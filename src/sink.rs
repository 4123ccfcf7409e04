use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The run's log file.
///
/// Every line is written through and flushed at once. A sink that failed to
/// open, or whose file hit a write error, silently ignores further writes.
#[derive(Debug)]
pub struct LogSink {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl LogSink {
    /// Creates or truncates the log file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<LogSink> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::LogOpen {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), "log file opened");
        Ok(LogSink {
            path: Some(path.to_owned()),
            file: Some(file),
        })
    }

    /// A sink that discards everything.
    pub fn disabled() -> LogSink {
        LogSink {
            path: None,
            file: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends `line` and a line terminator, then flushes.
    pub fn write(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = write_line(file, line) {
            warn!(path = ?self.path, error = %e, "log write failed, logging disabled");
            self.file = None;
        }
    }

    /// Flushes and releases the file. Calling it again does nothing.
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                warn!(path = ?self.path, error = %e, "log flush failed on close");
            }
            debug!(path = ?self.path, "log file closed");
        }
    }
}

fn write_line(file: &mut File, line: &str) -> io::Result<()> {
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.close();
    }
}
