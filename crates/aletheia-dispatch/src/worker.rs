//! Serial audit worker.
//!
//! A single dedicated thread drains a FIFO queue and fans each event out to
//! every configured sink, so slow sinks never add latency to the intercepted
//! request. There is no cancellation and no caller waiting on completion;
//! auditing is fire-and-forget by design.

use aletheia_core::AuditSink;
use std::sync::mpsc::{self, Sender, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

enum Command {
    Log(String),
    Flush(SyncSender<()>),
    Shutdown,
}

/// One-slot serial queue in front of the configured sinks.
///
/// Events enqueued from any thread are delivered to the sinks in FIFO order
/// by a single worker thread. Dropping the worker shuts the thread down and
/// closes every sink.
#[derive(Debug)]
pub struct SerialWorker {
    sender: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl SerialWorker {
    /// Spawns the worker thread over the given sinks.
    #[must_use]
    pub fn spawn(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        let (sender, receiver) = mpsc::channel::<Command>();
        let handle = std::thread::spawn(move || {
            while let Ok(command) = receiver.recv() {
                match command {
                    Command::Log(event) => {
                        // One sink's failure is its own problem; the contract
                        // of AuditSink::log is to never propagate.
                        for sink in &sinks {
                            sink.log(&event);
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                    Command::Shutdown => break,
                }
            }
            for sink in &sinks {
                sink.close();
            }
            debug!("audit worker stopped");
        });
        Self {
            sender,
            handle: Some(handle),
        }
    }

    /// Enqueues one formatted event for delivery.
    pub fn enqueue(&self, event: String) {
        if self.sender.send(Command::Log(event)).is_err() {
            warn!("audit worker is gone, dropping event");
        }
    }

    /// Blocks until every previously enqueued event has been delivered.
    ///
    /// Intended for tests and orderly shutdown; the hot path never waits.
    pub fn flush(&self) {
        let (done, wait) = mpsc::sync_channel(1);
        if self.sender.send(Command::Flush(done)).is_ok() {
            let _ = wait.recv();
        }
    }
}

impl Drop for SerialWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
