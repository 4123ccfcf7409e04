use std::io::Read;
use std::time::Duration;

use crate::LaunchSpec;
use crate::spawn::spawn;

fn read_all(mut source: Box<dyn Read + Send>) -> String {
    let mut content = String::new();
    source.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn good_cmd() {
    let spawned = spawn(&LaunchSpec::from_args(["true"])).unwrap();
    let status = spawned.process.wait().unwrap();
    assert!(status.success());
    assert_eq!(status.code(), Some(0));
    assert_eq!(status.to_string(), "exit code 0");
}

#[test]
fn bad_cmd() {
    let err = spawn(&LaunchSpec::from_args(["nosuchcommand-bgrunner"]))
        .err()
        .unwrap();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn err_exit() {
    let tmpdir = tempfile::TempDir::new().unwrap();
    let spec = super::common::script(tmpdir.path(), "exit.sh", "exit 13\n");
    let spawned = spawn(&spec).unwrap();
    assert_eq!(spawned.process.wait().unwrap().code(), Some(13));
}

#[test]
fn streams_are_separate_pipes() {
    let tmpdir = tempfile::TempDir::new().unwrap();
    let spec = super::common::script(tmpdir.path(), "both.sh", "echo out\necho err >&2\n");
    let spawned = spawn(&spec).unwrap();
    assert_eq!(read_all(spawned.stdout), "out\n");
    assert_eq!(read_all(spawned.stderr), "err\n");
    assert!(spawned.process.wait().unwrap().success());
}

#[test]
fn stdin_is_null() {
    let spawned = spawn(&LaunchSpec::from_args(["cat"])).unwrap();
    assert_eq!(read_all(spawned.stdout), "");
    assert!(spawned.process.wait().unwrap().success());
}

#[test]
fn kill_running() {
    let spawned = spawn(&LaunchSpec::from_args(["sleep", "1000"])).unwrap();
    let process = spawned.process;
    process.kill().unwrap();
    let status = process.wait().unwrap();
    assert_eq!(status.signal(), Some(libc::SIGKILL));
    assert_eq!(status.code(), None);
    assert!(!status.success());
    // already finished: a no-op
    process.kill().unwrap();
}

#[test]
fn kill_from_another_thread_while_waiting() {
    let spawned = spawn(&LaunchSpec::from_args(["sleep", "1000"])).unwrap();
    let process = spawned.process;
    let waiter = {
        let process = process.clone();
        std::thread::spawn(move || process.wait().unwrap())
    };
    std::thread::sleep(Duration::from_millis(50));
    process.kill().unwrap();
    assert_eq!(waiter.join().unwrap().signal(), Some(libc::SIGKILL));
}
