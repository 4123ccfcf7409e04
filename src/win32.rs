#![allow(non_snake_case)]

use std::io::{Error, Result};
use std::os::windows::io::{AsRawHandle, OwnedHandle};
use std::time::Duration;

use winapi::shared::minwindef::{BOOL, DWORD};
use winapi::shared::winerror::WAIT_TIMEOUT;
use winapi::um::minwinbase::STILL_ACTIVE as STILL_ACTIVE_STATUS;
use winapi::um::processthreadsapi;
use winapi::um::synchapi;
use winapi::um::winbase::{INFINITE, WAIT_ABANDONED, WAIT_FAILED, WAIT_OBJECT_0};

pub use winapi::shared::winerror::ERROR_ACCESS_DENIED;

pub const STILL_ACTIVE: u32 = STILL_ACTIVE_STATUS;

/// Creation flag: the process gets no console window.
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

fn check(status: BOOL) -> Result<()> {
    if status != 0 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

pub enum WaitEvent {
    Object0,
    Abandoned,
    Timeout,
}

pub fn WaitForSingleObject(handle: &OwnedHandle, timeout: Option<Duration>) -> Result<WaitEvent> {
    let millis: DWORD = match timeout {
        Some(dur) => dur.as_millis().min(INFINITE as u128 - 1) as DWORD,
        None => INFINITE,
    };
    let result = unsafe { synchapi::WaitForSingleObject(handle.as_raw_handle() as _, millis) };
    match result {
        WAIT_OBJECT_0 => Ok(WaitEvent::Object0),
        WAIT_ABANDONED => Ok(WaitEvent::Abandoned),
        WAIT_TIMEOUT => Ok(WaitEvent::Timeout),
        WAIT_FAILED => Err(Error::last_os_error()),
        other => Err(Error::other(format!(
            "WaitForSingleObject returned {}",
            other
        ))),
    }
}

pub fn GetExitCodeProcess(handle: &OwnedHandle) -> Result<u32> {
    let mut exit_code: DWORD = 0;
    check(unsafe {
        processthreadsapi::GetExitCodeProcess(handle.as_raw_handle() as _, &mut exit_code)
    })?;
    Ok(exit_code)
}

pub fn TerminateProcess(handle: &OwnedHandle, exit_code: u32) -> Result<()> {
    check(unsafe { processthreadsapi::TerminateProcess(handle.as_raw_handle() as _, exit_code) })
}
