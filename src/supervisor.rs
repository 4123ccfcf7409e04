//! Lifecycle of the one child process a launcher runs.

use std::io::{BufRead, BufReader, Read};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{ExitStatus, Process};
use crate::resolve::LaunchSpec;
use crate::router::{OutputLine, RouterHandle, StreamKind};
use crate::sink::LogSink;
use crate::spawn::{self, Spawned};

/// How long a close waits for a killed child to confirm its exit.
pub const GRACE_PERIOD: Duration = Duration::from_millis(100);

const RULE: &str = "----------";

/// Formats a launcher banner line.
pub fn banner(text: &str) -> String {
    format!("{} BGRunner: {} {}", RULE, text, RULE)
}

/// Lines shown when the launcher is started without a target.
pub const USAGE: [&str; 9] = [
    "No command line specified.",
    "~Major Tom to Ground Control: No runway in sight!~",
    "",
    "Usage:",
    "    BGRunner <command_line>",
    "",
    "    Start any process with window hidden.",
    "    Minimize this window to run in background.",
    "    Use the tray icon to bring back.",
];

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing launched. Terminal when the launch spec was empty.
    Idle,
    Starting,
    Running,
    Exited(ExitStatus),
    FailedToStart,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Exited(_) | Phase::FailedToStart)
    }
}

/// What the window layer needs from whoever owns the child.
pub trait ChildControl {
    fn is_running(&self) -> bool;

    /// Forcefully kills the child if it is running. Returns false, doing
    /// nothing, if it is not.
    fn request_kill(&self) -> bool;

    /// Waits up to `timeout` for the child's exit to be reported.
    fn wait_exit(&self, timeout: Duration) -> Option<ExitStatus>;
}

#[derive(Debug)]
struct RunRecord {
    phase: Phase,
    launched: bool,
    /// Held from spawn until the child is reaped.
    process: Option<Process>,
}

#[derive(Debug)]
struct Shared {
    run: Mutex<RunRecord>,
    exited: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunRecord> {
        self.run.lock().unwrap()
    }

    fn set_phase(&self, phase: Phase) {
        self.lock().phase = phase;
    }

    // The child is gone; its output may still be draining.
    fn reaped(&self) {
        self.lock().process = None;
    }

    fn finish(&self, status: ExitStatus) {
        let mut run = self.lock();
        run.phase = Phase::Exited(status);
        run.process = None;
        self.exited.notify_all();
    }
}

/// Owns the child: spawns it, wires its streams into the router, notices its
/// exit and kills it on request.
///
/// The run state lives here and nowhere else. The reader and exit-watcher
/// threads it starts only push lines into the router and report the exit back
/// through the shared record.
#[derive(Debug)]
pub struct ProcessSupervisor {
    router: RouterHandle,
    config: Config,
    shared: Arc<Shared>,
}

impl ProcessSupervisor {
    pub fn new(router: RouterHandle, config: Config) -> ProcessSupervisor {
        ProcessSupervisor {
            router,
            config,
            shared: Arc::new(Shared {
                run: Mutex::new(RunRecord {
                    phase: Phase::Idle,
                    launched: false,
                    process: None,
                }),
                exited: Condvar::new(),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// PID of the child while it runs.
    pub fn pid(&self) -> Option<u32> {
        self.shared.lock().process.as_ref().map(Process::pid)
    }

    /// Launches `spec`, returning the phase the run ended up in.
    ///
    /// An empty spec only prints usage help. Failing to open the log file or
    /// to spawn the child is reported on the output channel, not returned.
    /// A supervisor launches at most once; calling this again fails with
    /// [`Error::AlreadyStarted`].
    pub fn start(&self, spec: &LaunchSpec) -> Result<Phase> {
        {
            let mut run = self.shared.lock();
            if run.launched {
                return Err(Error::AlreadyStarted);
            }
            run.launched = true;
        }

        self.router.set_title(spec.title());
        if spec.is_empty() {
            for line in USAGE {
                self.router.banner(line);
            }
            return Ok(Phase::Idle);
        }

        self.shared.set_phase(Phase::Starting);
        self.open_log(spec);

        self.router.banner(spec.command_line());
        self.router.banner("");
        self.router.banner(banner("Starting process"));
        self.router.banner("");

        let spawned = match spawn::spawn(spec).and_then(|s| self.watch(s)) {
            Ok(process) => process,
            Err(e) => {
                let err = Error::Spawn(e);
                warn!(executable = spec.executable(), error = %err, "failed to start process");
                self.router.banner(banner("Failed to start process"));
                self.router.banner(err.os_message());
                self.router.close_log();
                self.shared.set_phase(Phase::FailedToStart);
                return Ok(Phase::FailedToStart);
            }
        };
        info!(pid = spawned.pid(), executable = spec.executable(), "process started");
        Ok(self.phase())
    }

    fn open_log(&self, spec: &LaunchSpec) {
        if !self.config.logging {
            debug!("logging disabled by configuration");
            return;
        }
        let path = self.config.log_dir.join(spec.log_file_name());
        match LogSink::open(&path) {
            Ok(sink) => self.router.attach_log(sink),
            Err(e) => {
                warn!(error = %e, "running without a log file");
                self.router.banner(banner("Failed to create log file"));
                self.router.banner(e.os_message());
                self.router.banner("");
                self.router.banner(banner("Log disabled"));
                self.router.banner("");
            }
        }
    }

    // Starts the reader and exit-watcher threads and records the child as
    // running.
    fn watch(&self, spawned: Spawned) -> std::io::Result<Process> {
        let Spawned {
            process,
            stdout,
            stderr,
        } = spawned;

        {
            let mut run = self.shared.lock();
            run.process = Some(process.clone());
            run.phase = Phase::Running;
        }

        let readers = match self.start_readers(stdout, stderr) {
            Ok(readers) => readers,
            Err(e) => {
                // Without readers the child would block on a full pipe.
                process.kill().ok();
                process.wait().ok();
                self.shared.lock().process = None;
                return Err(e);
            }
        };

        let router = self.router.clone();
        let shared = Arc::clone(&self.shared);
        let watched = process.clone();
        let watcher = thread::Builder::new()
            .name("bgrunner-exit".into())
            .spawn(move || watch_exit(watched, readers, router, shared));
        if let Err(e) = watcher {
            process.kill().ok();
            process.wait().ok();
            self.shared.lock().process = None;
            return Err(e);
        }
        Ok(process)
    }

    fn start_readers(
        &self,
        stdout: Box<dyn Read + Send>,
        stderr: Box<dyn Read + Send>,
    ) -> std::io::Result<Vec<JoinHandle<()>>> {
        let mut readers = Vec::with_capacity(2);
        for (source, kind) in [(stdout, StreamKind::Stdout), (stderr, StreamKind::Stderr)] {
            let router = self.router.clone();
            let reader = thread::Builder::new()
                .name(format!("bgrunner-{}", kind))
                .spawn(move || read_lines(source, kind, router))?;
            readers.push(reader);
        }
        Ok(readers)
    }

    /// Blocks until the exit has been reported, or the run never started.
    pub fn wait(&self) -> Option<ExitStatus> {
        let mut run = self.shared.lock();
        while matches!(run.phase, Phase::Starting | Phase::Running) {
            run = self.shared.exited.wait(run).unwrap();
        }
        match run.phase {
            Phase::Exited(status) => Some(status),
            _ => None,
        }
    }
}

impl ChildControl for ProcessSupervisor {
    fn is_running(&self) -> bool {
        let run = self.shared.lock();
        run.phase == Phase::Running && run.process.is_some()
    }

    fn request_kill(&self) -> bool {
        let run = self.shared.lock();
        let Some(process) = run.process.as_ref().filter(|_| run.phase == Phase::Running) else {
            return false;
        };
        info!(pid = process.pid(), "killing process");
        if let Err(e) = process.kill() {
            warn!(pid = process.pid(), error = %e, "kill failed");
        }
        true
    }

    fn wait_exit(&self, timeout: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + timeout;
        let mut run = self.shared.lock();
        loop {
            if let Phase::Exited(status) = run.phase {
                return Some(status);
            }
            if !matches!(run.phase, Phase::Starting | Phase::Running) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            run = self.shared.exited.wait_timeout(run, deadline - now).unwrap().0;
        }
    }
}

fn read_lines(source: Box<dyn Read + Send>, kind: StreamKind, router: RouterHandle) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let text = String::from_utf8_lossy(&buf);
                router.deliver(OutputLine::new(text, kind));
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!(stream = %kind, error = %e, "stream read failed");
                break;
            }
        }
    }
    debug!(stream = %kind, "stream closed");
}

// Reports the exit once the process is gone and both streams are drained, so
// the exit banner always follows the child's last line.
fn watch_exit(
    process: Process,
    readers: Vec<JoinHandle<()>>,
    router: RouterHandle,
    shared: Arc<Shared>,
) {
    let status = process.wait().unwrap_or_else(|e| {
        warn!(pid = process.pid(), error = %e, "waiting for process failed");
        ExitStatus::undetermined()
    });
    shared.reaped();
    for reader in readers {
        if reader.join().is_err() {
            warn!("stream reader panicked");
        }
    }
    info!(pid = process.pid(), %status, "process exited");

    router.banner("");
    router.banner(exit_banner(status));
    router.banner("");
    router.close_log();
    shared.finish(status);
}

/// The banner announcing how the child ended.
pub fn exit_banner(status: ExitStatus) -> String {
    match (status.code(), status.signal()) {
        (Some(code), _) => banner(&format!("Process exited with code {}", code)),
        (None, Some(signal)) => banner(&format!("Process killed by signal {}", signal)),
        (None, None) => banner(&format!("Process exited with {}", status)),
    }
}
