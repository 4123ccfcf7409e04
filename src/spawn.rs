use std::io::{self, Read};

use crate::process::Process;
use crate::resolve::LaunchSpec;

/// A freshly spawned child and the parent ends of its output pipes.
pub(crate) struct Spawned {
    pub process: Process,
    pub stdout: Box<dyn Read + Send>,
    pub stderr: Box<dyn Read + Send>,
}

/// Spawn the child described by `spec`.
///
/// Standard output and standard error each go to their own pipe, standard input reads
/// from the null device, no shell is involved, and on Windows the child gets no console
/// window.
pub(crate) fn spawn(spec: &LaunchSpec) -> io::Result<Spawned> {
    if spec.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no executable specified",
        ));
    }
    os::os_start(spec)
}

#[cfg(unix)]
mod os {
    use super::*;
    use crate::posix;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use std::os::unix::io::AsRawFd;

    /// Read exactly N bytes, or return None on immediate EOF.
    fn read_exact_or_eof<const N: usize>(source: &mut File) -> io::Result<Option<[u8; N]>> {
        let mut buf = [0u8; N];
        let mut total_read = 0;
        while total_read < N {
            let n = source.read(&mut buf[total_read..])?;
            if n == 0 {
                break;
            }
            total_read += n;
        }
        match total_read {
            0 => Ok(None),
            n if n == N => Ok(Some(buf)),
            _ => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }

    pub(super) fn os_start(spec: &LaunchSpec) -> io::Result<Spawned> {
        // Everything the child needs is allocated before fork().
        let argv = posix::CVec::new(&spec.argv())?;
        let null = OpenOptions::new().read(true).open("/dev/null")?;
        let (out_read, out_write) = posix::pipe()?;
        let (err_read, err_write) = posix::pipe()?;
        let mut exec_fail_pipe = posix::pipe()?;
        // dup2() clears FD_CLOEXEC on the target, so the child keeps only 0, 1 and 2.
        for f in [
            &null,
            &out_read,
            &out_write,
            &err_read,
            &err_write,
            &exec_fail_pipe.0,
            &exec_fail_pipe.1,
        ] {
            posix::set_cloexec(f)?;
        }

        let pid = match unsafe { posix::fork()? } {
            Some(pid) => pid,
            None => {
                let err = do_exec(&argv, &null, &out_write, &err_write);
                let error_code = err.raw_os_error().unwrap_or(-1) as u32;
                exec_fail_pipe.1.write_all(&error_code.to_le_bytes()).ok();
                posix::_exit(127);
            }
        };

        // Close the parent's copies of the child ends before blocking on the exec pipe.
        drop((null, out_write, err_write));
        drop(exec_fail_pipe.1);
        match read_exact_or_eof::<4>(&mut exec_fail_pipe.0)? {
            None => Ok(Spawned {
                process: Process::new(pid, ()),
                stdout: Box::new(out_read),
                stderr: Box::new(err_read),
            }),
            Some(error_buf) => {
                // The child exits right away with 127; reap it.
                posix::waitpid(pid, 0).ok();
                Err(io::Error::from_raw_os_error(
                    u32::from_le_bytes(error_buf) as i32
                ))
            }
        }
    }

    fn redirect(f: &File, target_fd: i32) -> io::Result<()> {
        if f.as_raw_fd() == target_fd {
            // already in place, but marked close-on-exec above
            posix::set_cloexec_flag(f, false)
        } else {
            posix::dup2(f.as_raw_fd(), target_fd)
        }
    }

    fn do_exec(argv: &posix::CVec, stdin: &File, stdout: &File, stderr: &File) -> io::Error {
        let setup = redirect(stdin, 0)
            .and_then(|_| redirect(stdout, 1))
            .and_then(|_| redirect(stderr, 2))
            .and_then(|_| posix::reset_sigpipe());
        match setup {
            Ok(()) => posix::execvp(argv),
            Err(e) => e,
        }
    }
}

#[cfg(windows)]
mod os {
    use super::*;
    use crate::process::ExtProcessState;
    use crate::win32;
    use std::os::windows::io::OwnedHandle;
    use std::os::windows::process::CommandExt;
    use std::process::{Command, Stdio};

    pub(super) fn os_start(spec: &LaunchSpec) -> io::Result<Spawned> {
        let mut command = Command::new(spec.executable());
        // Passed through untouched: the argument string is already a command line.
        if !spec.argument_string().is_empty() {
            command.raw_arg(spec.argument_string());
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .creation_flags(win32::CREATE_NO_WINDOW);

        let mut child = command.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr not piped"))?;
        let pid = child.id();
        let handle = OwnedHandle::from(child);
        Ok(Spawned {
            process: Process::new(pid, ExtProcessState(handle)),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        })
    }
}
