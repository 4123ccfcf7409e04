use std::env;
use std::process;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use bgrunner::console::{self, ConsoleDisplay, ConsoleWindow, ControlCommand};
use bgrunner::{
    ChildControl, CloseDecision, Config, ExitStatus, LaunchSpec, OutputRouter, Phase,
    ProcessSupervisor, VisibilityController,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

const SUCCESS: i32 = 0;
const FAILURE: i32 = 1;

fn main() {
    initialize_logging();
    // The child's code passes through in full, negative NTSTATUS values included.
    process::exit(launch());
}

fn launch() -> i32 {
    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let spec = LaunchSpec::from_args(&args);
    let config = Config::from_env();
    debug!(?spec, ?config, "resolved launch");

    let router = match OutputRouter::new(ConsoleDisplay::new()) {
        Ok(router) => router,
        Err(e) => {
            error!(error = %e, "failed to start output thread");
            return FAILURE;
        }
    };
    let supervisor = ProcessSupervisor::new(router.handle(), config);

    let code = match supervisor.start(&spec) {
        Ok(Phase::Idle) => SUCCESS,
        Ok(Phase::FailedToStart) => FAILURE,
        Ok(_) => run(&supervisor),
        Err(e) => {
            error!(error = %e, "launch failed");
            FAILURE
        }
    };
    router.shutdown();
    code
}

// Services stdin gestures until the child exits or a close is requested.
fn run(supervisor: &ProcessSupervisor) -> i32 {
    let mut window = VisibilityController::new(ConsoleWindow::default());
    let commands = match console::start_stdin_listener() {
        Ok(commands) => Some(commands),
        Err(e) => {
            debug!(error = %e, "no stdin control");
            None
        }
    };

    let status = match commands {
        Some(commands) => serve(supervisor, &mut window, &commands),
        None => supervisor.wait(),
    };
    exit_code(status)
}

fn serve(
    supervisor: &ProcessSupervisor,
    window: &mut VisibilityController<ConsoleWindow>,
    commands: &Receiver<ControlCommand>,
) -> Option<ExitStatus> {
    loop {
        if let Some(status) = supervisor.wait_exit(Duration::ZERO) {
            return Some(status);
        }
        if supervisor.phase().is_terminal() {
            return None;
        }
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(ControlCommand::Minimize) => {
                window.minimize();
            }
            Ok(ControlCommand::Restore) => {
                window.restore();
            }
            Ok(ControlCommand::Close) => {
                if window.request_close(supervisor) == CloseDecision::Deferred {
                    info!("closed while the child was running");
                }
                return supervisor.wait_exit(Duration::ZERO);
            }
            Err(RecvTimeoutError::Timeout) => {}
            // stdin is gone; nothing left to listen for
            Err(RecvTimeoutError::Disconnected) => return supervisor.wait(),
        }
    }
}

fn exit_code(status: Option<ExitStatus>) -> i32 {
    status.and_then(|s| s.code()).unwrap_or(FAILURE)
}

fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
