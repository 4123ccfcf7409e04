mod common;
mod resolve;
#[cfg(unix)]
mod process;

use crate::{
    Config, Error, ExitStatus, LaunchSpec, LogSink, OutputLine, Phase, Process, RouterHandle,
    Visibility,
};

fn assert_send_sync<T: Send + Sync>() {}
fn assert_send<T: Send>() {}

#[test]
fn public_types_are_send_and_sync() {
    assert_send_sync::<LaunchSpec>();
    assert_send_sync::<Config>();
    assert_send_sync::<ExitStatus>();
    assert_send_sync::<Process>();
    assert_send_sync::<OutputLine>();
    assert_send_sync::<Phase>();
    assert_send_sync::<Visibility>();
    assert_send_sync::<Error>();
    assert_send::<LogSink>();
    assert_send::<RouterHandle>();
}

#[cfg(windows)]
#[test]
fn windows_exit_codes_are_signed() {
    let status = ExitStatus::from_raw(0xC000_0005);
    assert_eq!(status.code(), Some(-1_073_741_819));
    assert_eq!(status.to_string(), "exit code -1073741819");
    assert_eq!(
        crate::exit_banner(status),
        crate::banner("Process exited with code -1073741819")
    );
}
