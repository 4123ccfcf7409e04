use chrono::{DateTime, Local, TimeZone};

/// Prefix of every log file name.
pub const LOG_FILE_PREFIX: &str = "BGRunnerLog_";

/// Title shown when no target is running.
pub const APP_NAME: &str = "BGRunner";

const INTERPRETERS: [&str; 2] = ["python", "python3"];

/// What to launch, derived from the launcher's own arguments.
///
/// A `LaunchSpec` is immutable once resolved. An empty spec (no executable)
/// means the launcher was started without a target and should only show
/// usage help.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchSpec {
    executable: String,
    argument_string: String,
    display_name: String,
    log_file_name: String,
}

impl LaunchSpec {
    /// Resolves the launcher arguments (program name excluded) using the
    /// local clock for the log file timestamp.
    pub fn from_args<I, S>(args: I) -> LaunchSpec
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        LaunchSpec::resolve(args, &Local::now())
    }

    /// Resolves the launcher arguments with an explicit timestamp.
    ///
    /// Arguments after the executable are joined with single spaces. When
    /// the executable is a Python interpreter, `-u` is injected ahead of the
    /// arguments and the script name becomes the display name.
    pub fn resolve<I, S, Tz>(args: I, now: &DateTime<Tz>) -> LaunchSpec
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let Some((executable, rest)) = args.split_first() else {
            return LaunchSpec::default();
        };

        let mut display_name = executable.trim().to_owned();
        let mut argument_string = String::new();
        if !rest.is_empty() {
            argument_string = rest.join(" ");
            if is_interpreter(executable) {
                display_name = rest[0].trim().to_owned();
                argument_string = format!("-u {}", argument_string);
            }
        }

        let log_file_name = format!(
            "{}{}_{}.txt",
            LOG_FILE_PREFIX,
            log_name(&display_name),
            now.format("%Y%m%d_%H%M%S%3f")
        );

        LaunchSpec {
            executable: executable.clone(),
            argument_string,
            display_name,
            log_file_name,
        }
    }

    /// True if no target was given.
    pub fn is_empty(&self) -> bool {
        self.executable.is_empty()
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Arguments passed to the child, as a single space-joined string.
    pub fn argument_string(&self) -> &str {
        &self.argument_string
    }

    /// Name used for the title. The log file uses its last path component.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn log_file_name(&self) -> &str {
        &self.log_file_name
    }

    /// The command echo printed before the child starts.
    pub fn command_line(&self) -> String {
        if self.argument_string.is_empty() {
            self.executable.clone()
        } else {
            format!("{} {}", self.executable, self.argument_string)
        }
    }

    /// Window title for this run.
    pub fn title(&self) -> String {
        if self.is_empty() {
            APP_NAME.to_owned()
        } else {
            format!("{} ({})", APP_NAME, self.display_name)
        }
    }

    /// Argument vector for platforms that take one, the executable followed
    /// by the argument string split on whitespace.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.executable.clone())
            .chain(self.argument_string.split_whitespace().map(str::to_owned))
            .collect()
    }
}

// Last path component, so the log file always lands in the log directory.
fn log_name(display_name: &str) -> &str {
    display_name
        .rsplit(['/', '\\', ':'])
        .find(|part| !part.is_empty())
        .unwrap_or_default()
}

fn is_interpreter(executable: &str) -> bool {
    INTERPRETERS
        .iter()
        .any(|name| executable.eq_ignore_ascii_case(name))
}
