use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Exit status of a process.
///
/// On Unix, the raw value is the status from `waitpid()`. On Windows, it is the exit code
/// from `GetExitCodeProcess()`. `None` means the process is known to have finished but
/// its status could not be collected.
#[derive(Eq, PartialEq, Hash, Copy, Clone)]
pub struct ExitStatus(pub(crate) Option<os::RawExitStatus>);

impl ExitStatus {
    pub(crate) fn from_raw(raw: os::RawExitStatus) -> ExitStatus {
        ExitStatus(Some(raw))
    }

    pub(crate) fn undetermined() -> ExitStatus {
        ExitStatus(None)
    }

    /// True if the exit status of the process is 0.
    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }
}

/// A handle to the running or finished child.
///
/// All methods take `&self`, so the supervisor's exit watcher can wait on the process
/// while the controlling thread kills it. Clones share the same state.
#[derive(Clone)]
pub struct Process(Arc<InnerProcess>);

struct InnerProcess {
    pid: u32,
    #[allow(dead_code)]
    ext: os::ExtProcessState,
    state: Mutex<ProcessState>,
}

#[derive(Debug)]
enum ProcessState {
    Running,
    Finished(ExitStatus),
}

impl Process {
    pub(crate) fn new(pid: u32, ext: os::ExtProcessState) -> Process {
        Process(Arc::new(InnerProcess {
            pid,
            ext,
            state: Mutex::new(ProcessState::Running),
        }))
    }

    pub fn pid(&self) -> u32 {
        self.0.pid
    }

    /// Wait for the process to finish and return its exit status.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        self.0.os_wait()
    }

    /// Forcefully kill the process.
    ///
    /// On Unix, this sends SIGKILL. On Windows, this calls `TerminateProcess`. Does
    /// nothing if the process is already known to have finished.
    pub fn kill(&self) -> io::Result<()> {
        self.0.os_kill()
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.lock().unwrap();
        f.debug_struct("Process")
            .field("pid", &self.0.pid)
            .field("state", &*state)
            .finish()
    }
}

#[cfg(unix)]
mod os {
    use super::*;
    use crate::posix;

    pub type ExtProcessState = ();
    pub type RawExitStatus = i32;

    impl ExitStatus {
        /// Returns the exit code if the process exited normally.
        pub fn code(&self) -> Option<i32> {
            let raw = self.0?;
            libc::WIFEXITED(raw).then(|| libc::WEXITSTATUS(raw))
        }

        /// Returns the signal number if the process was killed by a signal.
        pub fn signal(&self) -> Option<i32> {
            let raw = self.0?;
            libc::WIFSIGNALED(raw).then(|| libc::WTERMSIG(raw))
        }
    }

    impl fmt::Display for ExitStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.0 {
                Some(raw) if libc::WIFEXITED(raw) => {
                    write!(f, "exit code {}", libc::WEXITSTATUS(raw))
                }
                Some(raw) if libc::WIFSIGNALED(raw) => {
                    write!(f, "signal {}", libc::WTERMSIG(raw))
                }
                Some(raw) => write!(f, "unrecognized wait status: {} {:#x}", raw, raw),
                None => write!(f, "undetermined exit status"),
            }
        }
    }

    impl fmt::Debug for ExitStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ExitStatus({})", self)
        }
    }

    impl InnerProcess {
        // Polls with WNOHANG and an exponential backoff instead of blocking in waitpid(),
        // so that the state lock is never held across a blocking call and os_kill() is
        // never stuck behind a waiter.
        pub(super) fn os_wait(&self) -> io::Result<ExitStatus> {
            let mut delay = Duration::from_millis(1);
            loop {
                {
                    let mut state = self.state.lock().unwrap();
                    Self::waitpid_into(&mut state, self.pid)?;
                    if let ProcessState::Finished(status) = *state {
                        return Ok(status);
                    }
                }
                std::thread::sleep(delay);
                delay = (delay * 2).min(Duration::from_millis(50));
            }
        }

        pub(super) fn os_kill(&self) -> io::Result<()> {
            let state = self.state.lock().unwrap();
            match *state {
                ProcessState::Finished(_) => Ok(()),
                ProcessState::Running => match posix::kill(self.pid, posix::SIGKILL) {
                    // exited but not yet reaped
                    Err(e) if e.raw_os_error() == Some(posix::ESRCH) => Ok(()),
                    other => other,
                },
            }
        }

        fn waitpid_into(state: &mut ProcessState, pid: u32) -> io::Result<()> {
            if matches!(*state, ProcessState::Finished(_)) {
                return Ok(());
            }
            match posix::waitpid(pid, posix::WNOHANG) {
                Ok((pid_out, raw)) if pid_out == pid => {
                    *state = ProcessState::Finished(ExitStatus::from_raw(raw));
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.raw_os_error() == Some(posix::ECHILD) => {
                    // Someone else reaped the child; its status is lost.
                    *state = ProcessState::Finished(ExitStatus::undetermined());
                }
                Err(e) => return Err(e),
            }
            Ok(())
        }
    }
}

#[cfg(windows)]
mod os {
    use super::*;
    use crate::win32;
    use std::os::windows::io::OwnedHandle;

    #[derive(Debug)]
    pub struct ExtProcessState(pub(crate) OwnedHandle);

    pub type RawExitStatus = u32;

    impl ExitStatus {
        /// Returns the exit code. Always `Some` for a determined exit status.
        ///
        /// Signed, so NTSTATUS failures read as negative codes.
        pub fn code(&self) -> Option<i32> {
            self.0.map(|code| code as i32)
        }

        /// Always `None` on Windows.
        pub fn signal(&self) -> Option<i32> {
            None
        }
    }

    impl fmt::Display for ExitStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.0 {
                Some(code) => write!(f, "exit code {}", code as i32),
                None => write!(f, "undetermined exit status"),
            }
        }
    }

    impl fmt::Debug for ExitStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "ExitStatus({})", self)
        }
    }

    impl InnerProcess {
        pub(super) fn os_wait(&self) -> io::Result<ExitStatus> {
            loop {
                if let ProcessState::Finished(status) = *self.state.lock().unwrap() {
                    return Ok(status);
                }
                // The handle is immutable, so the wait runs without the lock.
                let event = win32::WaitForSingleObject(&self.ext.0, None)?;
                let mut state = self.state.lock().unwrap();
                if let ProcessState::Finished(status) = *state {
                    return Ok(status);
                }
                if let win32::WaitEvent::Object0 = event {
                    let status = ExitStatus::from_raw(win32::GetExitCodeProcess(&self.ext.0)?);
                    *state = ProcessState::Finished(status);
                    return Ok(status);
                }
            }
        }

        pub(super) fn os_kill(&self) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            if let ProcessState::Running = *state
                && let Err(err) = win32::TerminateProcess(&self.ext.0, 1)
            {
                if err.raw_os_error() != Some(win32::ERROR_ACCESS_DENIED as i32) {
                    return Err(err);
                }
                let rc = win32::GetExitCodeProcess(&self.ext.0)?;
                if rc == win32::STILL_ACTIVE {
                    return Err(err);
                }
                *state = ProcessState::Finished(ExitStatus::from_raw(rc));
            }
            Ok(())
        }
    }
}

#[cfg(windows)]
pub(crate) use os::ExtProcessState;
