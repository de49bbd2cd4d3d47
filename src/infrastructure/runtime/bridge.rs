//! Runtime bridge - connects sync TUI thread with async Tokio runtime
//!
//! The bridge owns the listener thread. Creating it starts the log
//! subscription; dropping it sends `Shutdown` and joins the thread, so the
//! subscription never outlives the screen that asked for it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::domain::Greeting;
use crate::infrastructure::runtime::worker::{run_async_worker, ListenerSettings};

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    /// Stop listening and exit the worker
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Connected and the log filter is registered
    Connected {
        endpoint: String,
        node_kind: String,
        head: u64,
    },
    /// A matching log was decoded
    Greeting(Greeting),
    /// A matching log arrived but could not be decoded
    DecodeFailed { message: String },
    /// Connection lost; next attempt after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// Error occurred
    Error { message: String },
}

/// Bridge between sync TUI thread and async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
    worker: Option<JoinHandle<()>>,
}

impl RuntimeBridge {
    /// Start the listener thread with its own Tokio runtime
    pub fn new(settings: ListenerSettings) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        let worker = thread::Builder::new()
            .name("greetform-listener".into())
            .spawn(move || {
                let rt = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Failed to create Tokio runtime: {err}"),
                        });
                        return;
                    }
                };
                rt.block_on(async {
                    if let Err(err) = run_async_worker(settings, cmd_rx, evt_tx.clone()).await {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Worker exited: {:#}", err),
                        });
                    }
                });
            })?;

        Ok(Self {
            cmd_tx,
            evt_rx,
            worker: Some(worker),
        })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        self.evt_rx.try_iter().collect()
    }

    /// Stop the worker and wait for it to release the subscription
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.send(RuntimeCommand::Shutdown).is_err() {
            debug!("listener thread already exited");
        }
        if worker.join().is_err() {
            warn!("listener thread panicked");
        } else {
            debug!("listener thread stopped");
        }
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
