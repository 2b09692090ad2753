// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::engine::core::{CoreRuntime, TriggerSlot};
use crate::engine::queue::{share, start_shared, PollJob, PollQueue};
use crate::engine::{
    CoreCommand, FiredTrigger, RuntimeEvent, RuntimeOptions, ScheduledTrigger, SharedTrigger,
    TriggerId,
};
use crate::errors::{FsTriggerError, Result};
use crate::types::TriggerKind;

struct Entry {
    name: String,
    handle: SharedTrigger,
    interval: Duration,
}

/// What a finished run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fired: Vec<FiredTrigger>,
}

/// Drives the pure [`CoreRuntime`] from timers and poll workers.
///
/// This struct handles async IO only: tickers, the per-kind poll queues,
/// the event channel and stdout. All scheduling decisions come from the core.
pub struct Runtime {
    core: CoreRuntime,
    entries: Vec<Entry>,
    options: RuntimeOptions,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// `event_tx` must feed `event_rx`; other producers (e.g. Ctrl-C) can
    /// hold clones of it.
    pub fn new(
        triggers: Vec<ScheduledTrigger>,
        options: RuntimeOptions,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        let slots = triggers
            .iter()
            .map(|t| TriggerSlot::new(t.trigger.name(), t.trigger.kind()))
            .collect();
        let entries = triggers
            .into_iter()
            .map(|t| Entry {
                name: t.trigger.name().to_string(),
                interval: t.interval,
                handle: share(t.trigger),
            })
            .collect();

        Self {
            core: CoreRuntime::new(slots, options),
            entries,
            options,
            event_rx,
            event_tx,
        }
    }

    /// Start every trigger, then poll until shutdown (or, with
    /// `exit_when_idle`, until every trigger was polled once).
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(triggers = self.entries.len(), "fstrigger runtime started");
        let mut summary = RunSummary::default();

        if self.entries.is_empty() {
            info!("no triggers to poll");
            return Ok(summary);
        }

        self.start_triggers().await?;

        let mut queues: BTreeMap<TriggerKind, PollQueue> = BTreeMap::new();
        for slot in self.core.slots() {
            queues
                .entry(slot.kind)
                .or_insert_with(|| PollQueue::spawn(slot.kind, self.event_tx.clone()));
        }

        let tickers = if self.options.exit_when_idle {
            for trigger in 0..self.entries.len() {
                let step = self.core.step(RuntimeEvent::TickElapsed { trigger });
                for command in step.commands {
                    self.execute_command(command, &queues, &mut summary)?;
                }
            }
            Vec::new()
        } else {
            self.spawn_tickers()
        };

        if self.core.is_idle() && self.options.exit_when_idle {
            info!("every trigger is disabled; nothing to poll");
        } else {
            loop {
                let event = match self.event_rx.recv().await {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                };

                debug!(?event, "runtime received event");
                let step = self.core.step(event);

                for command in step.commands {
                    self.execute_command(command, &queues, &mut summary)?;
                }

                if !step.keep_running {
                    info!("core requested exit; stopping runtime");
                    break;
                }
            }
        }

        for ticker in tickers {
            ticker.abort();
        }
        drop(self.event_rx);
        for (_, queue) in queues {
            queue.shutdown().await;
        }

        info!(fired = summary.fired.len(), "runtime exiting");
        Ok(summary)
    }

    /// Start triggers one after another. A trigger that fails with a
    /// configuration error is disabled; any other failure is left to the
    /// next poll, which takes its state as the baseline.
    async fn start_triggers(&mut self) -> Result<()> {
        for id in 0..self.entries.len() {
            let handle = self.entries[id].handle.clone();
            let (name, result) = tokio::task::spawn_blocking(move || start_shared(&handle))
                .await
                .map_err(|e| FsTriggerError::Other(anyhow::anyhow!("start task failed: {e}")))?;

            match result {
                Ok(()) => debug!(trigger = %name, "trigger started"),
                Err(err) if err.is_fatal_config() => {
                    error!(trigger = %name, error = %err, "configuration error at startup; trigger disabled");
                    self.core.disable(id);
                }
                Err(err) => {
                    warn!(trigger = %name, error = %err, "start failed; the next poll takes the baseline");
                }
            }
        }
        Ok(())
    }

    fn spawn_tickers(&self) -> Vec<JoinHandle<()>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, entry)| spawn_ticker(id, &entry.name, entry.interval, self.event_tx.clone()))
            .collect()
    }

    /// Execute a single command from the core.
    fn execute_command(
        &self,
        command: CoreCommand,
        queues: &BTreeMap<TriggerKind, PollQueue>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match command {
            CoreCommand::EnqueuePoll { trigger, kind } => {
                let (Some(entry), Some(queue)) = (self.entries.get(trigger), queues.get(&kind)) else {
                    warn!(trigger, %kind, "no queue for trigger; poll skipped");
                    return Ok(());
                };
                queue.submit(PollJob {
                    trigger,
                    name: entry.name.clone(),
                    handle: entry.handle.clone(),
                })?;
            }
            CoreCommand::Fire(fired) => {
                println!("TRIGGERED {}: {}", fired.name, fired.cause);
                summary.fired.push(fired);
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}

fn spawn_ticker(
    trigger: TriggerId,
    name: &str,
    period: Duration,
    tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    debug!(trigger = %name, ?period, "ticker started");
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.send(RuntimeEvent::TickElapsed { trigger }).await.is_err() {
                break;
            }
        }
    })
}
