use std::ffi::{CString, OsStr};
use std::fs::File;
use std::io::{Error, Result};
use std::iter;
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::ptr;

pub use libc::{ECHILD, ESRCH, SIGKILL};

pub const WNOHANG: i32 = libc::WNOHANG;

fn check_err<T: Ord + Default>(num: T) -> Result<T> {
    if num < T::default() {
        return Err(Error::last_os_error());
    }
    Ok(num)
}

pub fn pipe() -> Result<(File, File)> {
    let mut fds = [0 as libc::c_int; 2];
    check_err(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
}

/// Marks `f` close-on-exec.
pub fn set_cloexec(f: &File) -> Result<()> {
    set_cloexec_flag(f, true)
}

pub fn set_cloexec_flag(f: &File, cloexec: bool) -> Result<()> {
    let fd = f.as_raw_fd();
    let old = check_err(unsafe { libc::fcntl(fd, libc::F_GETFD) })?;
    let new = if cloexec {
        old | libc::FD_CLOEXEC
    } else {
        old & !libc::FD_CLOEXEC
    };
    check_err(unsafe { libc::fcntl(fd, libc::F_SETFD, new) })?;
    Ok(())
}

/// Returns `None` in the child and `Some(pid)` in the parent.
///
/// # Safety
///
/// The child may only call async-signal-safe functions before exec.
pub unsafe fn fork() -> Result<Option<u32>> {
    let pid = check_err(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(None)
    } else {
        Ok(Some(pid as u32))
    }
}

fn os_to_cstring(s: &OsStr) -> Result<CString> {
    CString::new(s.as_bytes()).map_err(|_| Error::from_raw_os_error(libc::EINVAL))
}

/// A null-terminated `argv` whose pointers stay valid as long as it lives.
#[derive(Debug)]
pub struct CVec {
    // pointed to by `ptrs`
    #[allow(dead_code)]
    strings: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CVec {
    pub fn new<S: AsRef<OsStr>>(slice: &[S]) -> Result<CVec> {
        let strings = slice
            .iter()
            .map(|s| os_to_cstring(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let ptrs = strings
            .iter()
            .map(|s| s.as_ptr())
            .chain(iter::once(ptr::null()))
            .collect();
        Ok(CVec { strings, ptrs })
    }

    fn as_c_vec(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }

    fn first(&self) -> *const libc::c_char {
        self.ptrs[0]
    }
}

/// Replaces the current process image. Only returns on failure.
pub fn execvp(argv: &CVec) -> Error {
    unsafe {
        libc::execvp(argv.first(), argv.as_c_vec());
    }
    Error::last_os_error()
}

pub fn dup2(oldfd: i32, newfd: i32) -> Result<()> {
    check_err(unsafe { libc::dup2(oldfd, newfd) })?;
    Ok(())
}

pub fn _exit(status: u8) -> ! {
    unsafe { libc::_exit(status as libc::c_int) }
}

/// Restores the signal state a freshly exec'd program expects.
///
/// The Rust runtime ignores SIGPIPE, and the ignore disposition as well as the
/// signal mask survive exec.
pub fn reset_sigpipe() -> Result<()> {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        check_err(libc::sigemptyset(set.as_mut_ptr()))?;
        let set = set.assume_init();
        let rc = libc::pthread_sigmask(libc::SIG_SETMASK, &set, ptr::null_mut());
        if rc != 0 {
            return Err(Error::from_raw_os_error(rc));
        }
        if libc::signal(libc::SIGPIPE, libc::SIG_DFL) == libc::SIG_ERR {
            return Err(Error::last_os_error());
        }
    }
    Ok(())
}

/// Returns the reaped pid (0 with `WNOHANG` if nothing changed) and the raw
/// wait status.
pub fn waitpid(pid: u32, flags: i32) -> Result<(u32, i32)> {
    let mut status = 0 as libc::c_int;
    let pid = check_err(unsafe {
        libc::waitpid(pid as libc::pid_t, &mut status as *mut libc::c_int, flags)
    })?;
    Ok((pid as u32, status))
}

pub fn kill(pid: u32, signal: i32) -> Result<()> {
    check_err(unsafe { libc::kill(pid as libc::pid_t, signal) })?;
    Ok(())
}
