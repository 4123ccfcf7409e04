use std::time::Duration;

use tracing::{debug, info};

use crate::supervisor::{ChildControl, GRACE_PERIOD};

/// Whether the launcher window is on screen or parked in the tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Minimized,
}

/// Outcome of a close request.
///
/// Either way the window may close once
/// [`request_close`](VisibilityController::request_close) returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Nothing was running; the close went ahead at once.
    Allow,
    /// The close was held back while the running child was killed and given
    /// the grace period to exit.
    Deferred,
}

/// The window surface the controller drives.
pub trait WindowHost {
    /// Show the window and hide the tray indicator.
    fn show_window(&mut self);
    /// Hide the window behind a tray indicator.
    fn hide_to_tray(&mut self);
}

/// Two-state machine behind the minimize, restore and close gestures.
#[derive(Debug)]
pub struct VisibilityController<H> {
    state: Visibility,
    host: H,
    grace: Duration,
}

impl<H: WindowHost> VisibilityController<H> {
    pub fn new(host: H) -> VisibilityController<H> {
        VisibilityController {
            state: Visibility::Visible,
            host,
            grace: GRACE_PERIOD,
        }
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Parks the window in the tray. Returns false if it already was.
    pub fn minimize(&mut self) -> bool {
        if self.state == Visibility::Minimized {
            return false;
        }
        self.state = Visibility::Minimized;
        self.host.hide_to_tray();
        debug!("window minimized");
        true
    }

    /// Brings the window back. Returns false if it was already visible.
    pub fn restore(&mut self) -> bool {
        if self.state == Visibility::Visible {
            return false;
        }
        self.state = Visibility::Visible;
        self.host.show_window();
        debug!("window restored");
        true
    }

    /// Handles a request to close the launcher.
    ///
    /// A running child is killed first and given up to the grace period to
    /// report its exit; after that the close proceeds whether or not it did.
    pub fn request_close(&mut self, child: &impl ChildControl) -> CloseDecision {
        if !child.is_running() || !child.request_kill() {
            return CloseDecision::Allow;
        }
        match child.wait_exit(self.grace) {
            Some(status) => info!(%status, "child exited before close"),
            None => info!(grace = ?self.grace, "child did not confirm exit, closing anyway"),
        }
        CloseDecision::Deferred
    }
}
