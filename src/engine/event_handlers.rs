// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, error, info, warn};

use crate::detect::PollVerdict;
use crate::engine::core::TriggerSlot;
use crate::engine::{RuntimeOptions, TriggerId};
use crate::types::TriggerKind;

/// A change reported to the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTrigger {
    pub name: String,
    pub cause: String,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand a poll of this trigger to the queue of its kind.
    EnqueuePoll { trigger: TriggerId, kind: TriggerKind },
    /// Announce a detected change.
    Fire(FiredTrigger),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle an elapsed interval.
///
/// A tick for a trigger whose previous poll is still queued or running is
/// dropped, so a slow host never builds up a backlog.
pub fn handle_tick(slots: &mut [TriggerSlot], trigger: TriggerId) -> CoreStep {
    let Some(slot) = slots.get_mut(trigger) else {
        warn!(trigger, "tick for unknown trigger ignored");
        return CoreStep::running(Vec::new());
    };

    if slot.disabled {
        return CoreStep::running(Vec::new());
    }
    if slot.pending {
        debug!(trigger = %slot.name, "previous poll still pending; tick dropped");
        return CoreStep::running(Vec::new());
    }

    slot.pending = true;
    CoreStep::running(vec![CoreCommand::EnqueuePoll {
        trigger,
        kind: slot.kind,
    }])
}

/// Handle a finished poll.
///
/// - A change produces a [`CoreCommand::Fire`].
/// - A configuration error disables the trigger; other errors are retried
///   at the next tick.
/// - With `exit_when_idle`, the runtime stops once every enabled trigger
///   has been polled and nothing is pending.
pub fn handle_poll_completed(
    slots: &mut [TriggerSlot],
    options: &RuntimeOptions,
    trigger: TriggerId,
    verdict: PollVerdict,
) -> CoreStep {
    let mut commands = Vec::new();

    if let Some(slot) = slots.get_mut(trigger) {
        slot.pending = false;
        slot.polls += 1;

        if let Some(err) = &verdict.error {
            if verdict.is_fatal() {
                error!(trigger = %slot.name, error = %err, "configuration error; trigger disabled");
                slot.disabled = true;
            } else {
                warn!(trigger = %slot.name, error = %err, "poll failed; retrying at the next tick");
            }
        }

        if verdict.changed {
            let cause = verdict.cause.unwrap_or(slot.kind.cause()).to_string();
            info!(trigger = %slot.name, %cause, "change detected");
            commands.push(CoreCommand::Fire(FiredTrigger {
                name: slot.name.clone(),
                cause,
            }));
        }
    } else {
        warn!(trigger, "completion for unknown trigger ignored");
    }

    if options.exit_when_idle && all_polled(slots) {
        info!("every trigger polled and exit_when_idle=true, stopping");
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::running(commands)
}

fn all_polled(slots: &[TriggerSlot]) -> bool {
    slots
        .iter()
        .all(|s| !s.pending && (s.disabled || s.polls > 0))
}
