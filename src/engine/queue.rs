// src/engine/queue.rs

use std::sync::{Arc, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::detect::{PollVerdict, Trigger};
use crate::engine::{RuntimeEvent, SharedTrigger, TriggerId};
use crate::errors::FsTriggerError;
use crate::poll_log::PollLog;
use crate::types::TriggerKind;

/// One poll to run.
#[derive(Debug)]
pub struct PollJob {
    pub trigger: TriggerId,
    pub name: String,
    pub handle: SharedTrigger,
}

/// Single-worker queue for the polls of one trigger kind.
///
/// Jobs run strictly one after another on the blocking pool, so two polls
/// of the same kind never overlap. Each verdict is sent back to the runtime
/// as [`RuntimeEvent::PollCompleted`].
#[derive(Debug)]
pub struct PollQueue {
    kind: TriggerKind,
    jobs_tx: mpsc::UnboundedSender<PollJob>,
    worker: JoinHandle<()>,
}

impl PollQueue {
    /// Spawn the worker for `kind`. Must be called inside a Tokio runtime.
    pub fn spawn(kind: TriggerKind, events_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker_loop(kind, jobs_rx, events_tx));
        Self {
            kind,
            jobs_tx,
            worker,
        }
    }

    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    /// Queue a job. Fails only when the worker has stopped.
    pub fn submit(&self, job: PollJob) -> Result<(), FsTriggerError> {
        self.jobs_tx.send(job).map_err(|e| {
            FsTriggerError::Other(anyhow::anyhow!(
                "{} poll queue is closed; dropped poll of '{}'",
                self.kind,
                e.0.name
            ))
        })
    }

    /// Stop accepting jobs and wait for the worker to drain.
    pub async fn shutdown(self) {
        drop(self.jobs_tx);
        if let Err(err) = self.worker.await {
            error!(kind = %self.kind, error = %err, "poll worker ended abnormally");
        }
    }
}

async fn worker_loop(
    kind: TriggerKind,
    mut jobs_rx: mpsc::UnboundedReceiver<PollJob>,
    events_tx: mpsc::Sender<RuntimeEvent>,
) {
    while let Some(job) = jobs_rx.recv().await {
        let PollJob {
            trigger,
            name,
            handle,
        } = job;
        debug!(%kind, trigger = %name, "poll started");

        let verdict = match tokio::task::spawn_blocking(move || poll_shared(&handle)).await {
            Ok(verdict) => verdict,
            Err(err) => {
                let mut log = PollLog::new();
                log.error(format!("Polling error {err}"));
                PollVerdict {
                    trigger: name,
                    changed: false,
                    cause: None,
                    log,
                    error: Some(FsTriggerError::Other(anyhow::anyhow!("poll task failed: {err}"))),
                }
            }
        };

        if events_tx
            .send(RuntimeEvent::PollCompleted { trigger, verdict })
            .await
            .is_err()
        {
            debug!(%kind, "runtime gone; poll worker stopping");
            break;
        }
    }
}

/// Run one blocking poll on a shared trigger.
pub fn poll_shared(handle: &SharedTrigger) -> PollVerdict {
    let mut trigger = handle.lock().unwrap_or_else(PoisonError::into_inner);
    trigger.check()
}

/// Run the blocking start of a shared trigger.
pub fn start_shared(handle: &SharedTrigger) -> (String, Result<(), FsTriggerError>) {
    let mut trigger = handle.lock().unwrap_or_else(PoisonError::into_inner);
    let mut log = PollLog::new();
    let result = trigger.start(&mut log);
    (trigger.name().to_string(), result)
}

/// Wrap a trigger for sharing with the workers.
pub fn share(trigger: Box<dyn Trigger>) -> SharedTrigger {
    Arc::new(std::sync::Mutex::new(trigger))
}
