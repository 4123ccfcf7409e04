use chrono::{FixedOffset, TimeZone};

use crate::LaunchSpec;

fn at_noon() -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 9, 12, 5, 7)
        .unwrap()
        + chrono::Duration::milliseconds(42)
}

#[test]
fn no_arguments_means_no_target() {
    let spec = LaunchSpec::resolve(Vec::<String>::new(), &at_noon());
    assert!(spec.is_empty());
    assert_eq!(spec.executable(), "");
    assert_eq!(spec.argument_string(), "");
    assert_eq!(spec.log_file_name(), "");
    assert_eq!(spec.title(), "BGRunner");
}

#[test]
fn executable_only() {
    let spec = LaunchSpec::resolve(["/no/such/binary"], &at_noon());
    assert!(!spec.is_empty());
    assert_eq!(spec.executable(), "/no/such/binary");
    assert_eq!(spec.argument_string(), "");
    assert_eq!(spec.display_name(), "/no/such/binary");
    assert_eq!(spec.command_line(), "/no/such/binary");
}

#[test]
fn arguments_are_joined_with_single_spaces() {
    let spec = LaunchSpec::resolve(["/bin/echo", "hi", "there", "a b"], &at_noon());
    assert_eq!(spec.argument_string(), "hi there a b");
    assert_eq!(spec.display_name(), "/bin/echo");
    assert_eq!(spec.command_line(), "/bin/echo hi there a b");
    // quoting is not preserved
    assert_eq!(spec.argv(), ["/bin/echo", "hi", "there", "a", "b"]);
}

#[test]
fn display_name_is_trimmed() {
    let spec = LaunchSpec::resolve([" tool ", "x"], &at_noon());
    assert_eq!(spec.executable(), " tool ");
    assert_eq!(spec.display_name(), "tool");
    assert_eq!(spec.title(), "BGRunner (tool)");
}

#[test]
fn log_file_name_has_millisecond_timestamp() {
    let spec = LaunchSpec::resolve(["server", "--port", "80"], &at_noon());
    assert_eq!(spec.log_file_name(), "BGRunnerLog_server_20240309_120507042.txt");
}

#[test]
fn log_file_name_drops_directories() {
    let spec = LaunchSpec::resolve(["/bin/echo", "hi"], &at_noon());
    assert_eq!(spec.display_name(), "/bin/echo");
    assert_eq!(spec.title(), "BGRunner (/bin/echo)");
    assert_eq!(spec.log_file_name(), "BGRunnerLog_echo_20240309_120507042.txt");

    for (exe, name) in [
        ("./tool", "tool"),
        (r"C:\tools\srv.exe", "srv.exe"),
        ("dir/", "dir"),
        ("/", ""),
    ] {
        let spec = LaunchSpec::resolve([exe], &at_noon());
        assert_eq!(
            spec.log_file_name(),
            format!("BGRunnerLog_{}_20240309_120507042.txt", name)
        );
    }

    let spec = LaunchSpec::resolve(["python", "jobs/run.py"], &at_noon());
    assert_eq!(spec.display_name(), "jobs/run.py");
    assert_eq!(spec.log_file_name(), "BGRunnerLog_run.py_20240309_120507042.txt");
}

#[test]
fn python_script_becomes_the_identity() {
    let spec = LaunchSpec::resolve(["python", "script.py", "--x"], &at_noon());
    assert_eq!(spec.executable(), "python");
    assert_eq!(spec.display_name(), "script.py");
    assert_eq!(spec.argument_string(), "-u script.py --x");
    assert_eq!(spec.title(), "BGRunner (script.py)");
    assert_eq!(
        spec.log_file_name(),
        "BGRunnerLog_script.py_20240309_120507042.txt"
    );
    assert_eq!(spec.argv(), ["python", "-u", "script.py", "--x"]);
}

#[test]
fn python_match_is_case_insensitive() {
    for exe in ["PYTHON", "Python3", "python3"] {
        let spec = LaunchSpec::resolve([exe, " job.py "], &at_noon());
        assert_eq!(spec.display_name(), "job.py");
        assert_eq!(spec.argument_string(), "-u  job.py ");
    }
}

#[test]
fn python_without_script_is_not_special() {
    let spec = LaunchSpec::resolve(["python"], &at_noon());
    assert_eq!(spec.display_name(), "python");
    assert_eq!(spec.argument_string(), "");
}

#[test]
fn other_interpreters_are_not_special() {
    let spec = LaunchSpec::resolve(["/usr/bin/python3", "s.py"], &at_noon());
    assert_eq!(spec.display_name(), "/usr/bin/python3");
    assert_eq!(spec.argument_string(), "s.py");
}

#[test]
fn from_args_uses_the_clock() {
    let spec = LaunchSpec::from_args(["tool"]);
    let name = spec.log_file_name();
    assert!(name.starts_with("BGRunnerLog_tool_"));
    assert!(name.ends_with(".txt"));
    // yyyyMMdd_HHmmssfff
    let stamp = &name["BGRunnerLog_tool_".len()..name.len() - ".txt".len()];
    assert_eq!(stamp.len(), 18);
    assert_eq!(stamp.as_bytes()[8], b'_');
}
