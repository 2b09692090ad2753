// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - running tickers
//! - handing polls to the per-kind queues
//! - printing fired triggers
//!
//! The core is unit tested without any Tokio, channels, filesystem, or hosts.

use crate::engine::event_handlers::{handle_poll_completed, handle_tick, CoreStep};
use crate::engine::{RuntimeEvent, RuntimeOptions, TriggerId};
use crate::types::TriggerKind;

/// Book-keeping for one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSlot {
    pub name: String,
    pub kind: TriggerKind,
    /// A poll is queued or running.
    pub pending: bool,
    /// Stopped after a configuration error.
    pub disabled: bool,
    pub polls: u64,
}

impl TriggerSlot {
    pub fn new(name: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            pending: false,
            disabled: false,
            polls: 0,
        }
    }
}

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    slots: Vec<TriggerSlot>,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(slots: Vec<TriggerSlot>, options: RuntimeOptions) -> Self {
        Self { slots, options }
    }

    pub fn slots(&self) -> &[TriggerSlot] {
        &self.slots
    }

    /// Stop scheduling `trigger` (e.g. it failed to start with a config error).
    pub fn disable(&mut self, trigger: TriggerId) {
        if let Some(slot) = self.slots.get_mut(trigger) {
            slot.disabled = true;
        }
    }

    /// True when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(|s| !s.pending)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TickElapsed { trigger } => handle_tick(&mut self.slots, trigger),
            RuntimeEvent::PollCompleted { trigger, verdict } => {
                handle_poll_completed(&mut self.slots, &self.options, trigger, verdict)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
