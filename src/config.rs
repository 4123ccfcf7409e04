//! Launcher configuration.
//!
//! The launcher takes no command-line flags, since everything after the
//! executable belongs to the child. The few knobs it has are read from the
//! environment instead.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

/// Directory that receives the run's log file.
pub const LOG_DIR_VAR: &str = "BGRUNNER_LOG_DIR";

/// Set to a non-empty value other than `0` to run without a log file.
pub const NO_LOG_VAR: &str = "BGRUNNER_NO_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where log files are created. Relative paths resolve against the
    /// working directory.
    pub log_dir: PathBuf,
    /// Whether a log file is written at all.
    pub logging: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            log_dir: PathBuf::from("."),
            logging: true,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Config {
        Config::from_vars(env::var_os(LOG_DIR_VAR), env::var_os(NO_LOG_VAR))
    }

    pub(crate) fn from_vars(log_dir: Option<OsString>, no_log: Option<OsString>) -> Config {
        let mut config = Config::default();
        if let Some(dir) = log_dir.filter(|d| !d.is_empty()) {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(flag) = no_log {
            config.logging = flag.is_empty() || flag == "0";
        }
        config
    }

    /// Sets the log directory.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Config {
        self.log_dir = dir.into();
        self
    }

    /// Disables the log file.
    pub fn without_log(mut self) -> Config {
        self.logging = false;
        self
    }
}
