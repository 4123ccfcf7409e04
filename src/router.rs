//! The single path every output line travels.
//!
//! Stream readers, the exit watcher and the supervisor all hold a
//! [`RouterHandle`] and push messages into one channel. A dedicated consumer
//! thread owns the display and the log file and handles the messages strictly
//! one at a time, so the sinks never see concurrent writes. Order is kept per
//! sender; lines from stdout and stderr interleave however they arrive.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::sink::LogSink;

/// Which of the child's streams a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        })
    }
}

/// One line of child output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub text: String,
    pub stream: StreamKind,
}

impl OutputLine {
    pub fn new(text: impl Into<String>, stream: StreamKind) -> OutputLine {
        OutputLine {
            text: text.into(),
            stream,
        }
    }
}

/// Where lines are shown to the user.
///
/// Called only from the router's consumer thread.
pub trait DisplaySink: Send {
    fn on_line(&mut self, text: &str);
    fn on_title_changed(&mut self, title: &str);
}

enum Message {
    Line(String),
    Title(String),
    AttachLog(LogSink),
    CloseLog,
    Shutdown,
}

/// Producer side of the router. Cheap to clone and safe to use from any
/// thread.
#[derive(Clone)]
pub struct RouterHandle {
    sender: Sender<Message>,
    alive: Arc<AtomicBool>,
}

impl RouterHandle {
    /// Routes a line of child output.
    pub fn deliver(&self, line: OutputLine) {
        self.send(Message::Line(line.text));
    }

    /// Routes a line produced by the launcher itself.
    pub fn banner(&self, text: impl Into<String>) {
        self.send(Message::Line(text.into()));
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.send(Message::Title(title.into()));
    }

    /// True until the consumer has been torn down.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn attach_log(&self, sink: LogSink) {
        self.send(Message::AttachLog(sink));
    }

    pub(crate) fn close_log(&self) {
        self.send(Message::CloseLog);
    }

    fn send(&self, message: Message) {
        // Nowhere left to go once the consumer is gone.
        if self.is_alive() {
            self.sender.send(message).ok();
        }
    }
}

impl fmt::Debug for RouterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Owner of the consumer thread.
pub struct OutputRouter {
    handle: RouterHandle,
    worker: Option<JoinHandle<()>>,
}

impl OutputRouter {
    /// Starts the consumer thread, which takes ownership of `display`.
    pub fn new(display: impl DisplaySink + 'static) -> io::Result<OutputRouter> {
        let (sender, receiver) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let consumer = Consumer {
            display: Box::new(display),
            log: LogSink::disabled(),
            alive: Arc::clone(&alive),
        };
        let worker = thread::Builder::new()
            .name("bgrunner-output".into())
            .spawn(move || consumer.run(receiver))?;
        Ok(OutputRouter {
            handle: RouterHandle { sender, alive },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> RouterHandle {
        self.handle.clone()
    }

    /// Processes everything queued so far, closes the log and tears the
    /// consumer down. Later deliveries are dropped.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.handle.sender.send(Message::Shutdown).ok();
        if worker.join().is_err() {
            warn!("output consumer panicked");
        }
        self.handle.alive.store(false, Ordering::Release);
    }
}

impl fmt::Debug for OutputRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputRouter")
            .field("alive", &self.handle.is_alive())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for OutputRouter {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Consumer {
    display: Box<dyn DisplaySink>,
    log: LogSink,
    alive: Arc<AtomicBool>,
}

impl Consumer {
    fn run(mut self, receiver: Receiver<Message>) {
        for message in receiver.iter() {
            match message {
                Message::Line(text) => {
                    self.log.write(&text);
                    self.display.on_line(&text);
                }
                Message::Title(title) => self.display.on_title_changed(&title),
                Message::AttachLog(sink) => {
                    self.log.close();
                    self.log = sink;
                }
                Message::CloseLog => self.log.close(),
                Message::Shutdown => break,
            }
        }
        self.alive.store(false, Ordering::Release);
        self.log.close();
        debug!("output consumer stopped");
    }
}
