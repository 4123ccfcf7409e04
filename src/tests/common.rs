use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use crate::{Config, DisplaySink, LaunchSpec, OutputRouter, ProcessSupervisor};

/// Display that records what it is shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    pub lines: Arc<Mutex<Vec<String>>>,
    pub titles: Arc<Mutex<Vec<String>>>,
}

impl RecordingDisplay {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

impl DisplaySink for RecordingDisplay {
    fn on_line(&mut self, text: &str) {
        self.lines.lock().unwrap().push(text.to_owned());
    }

    fn on_title_changed(&mut self, title: &str) {
        self.titles.lock().unwrap().push(title.to_owned());
    }
}

/// A supervisor wired to a recording display, logging into a scratch directory.
pub struct Harness {
    pub tmpdir: TempDir,
    pub display: RecordingDisplay,
    pub router: Option<OutputRouter>,
    pub supervisor: ProcessSupervisor,
}

impl Harness {
    pub fn new() -> Harness {
        let tmpdir = TempDir::new().unwrap();
        let config = Config::default().log_dir(tmpdir.path());
        Harness::with_config(tmpdir, config)
    }

    pub fn with_config(tmpdir: TempDir, config: Config) -> Harness {
        let display = RecordingDisplay::default();
        let router = OutputRouter::new(display.clone()).unwrap();
        let supervisor = ProcessSupervisor::new(router.handle(), config);
        Harness {
            tmpdir,
            display,
            router: Some(router),
            supervisor,
        }
    }

    /// Drains the router so every queued line has reached the sinks.
    pub fn finish(&mut self) -> Vec<String> {
        if let Some(router) = self.router.take() {
            router.shutdown();
        }
        self.display.lines()
    }

    pub fn log_files(&self) -> Vec<PathBuf> {
        log_files(self.tmpdir.path())
    }
}

pub fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(crate::LOG_FILE_PREFIX))
        })
        .collect();
    files.sort();
    files
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Writes an executable shell script and returns a spec running it through `sh`.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> LaunchSpec {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    LaunchSpec::from_args(["sh", path.to_str().unwrap()])
}

pub const LONG_WAIT: Duration = Duration::from_secs(10);
