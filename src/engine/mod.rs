// src/engine/mod.rs

//! Polling engine for fstrigger.
//!
//! This module ties together:
//! - one ticker per trigger at its configured interval
//! - one single-worker poll queue per trigger kind
//! - the main runtime event loop that reacts to:
//!   - elapsed ticks
//!   - completed polls
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::detect::{PollVerdict, Trigger};

/// Index of a trigger in the runtime's trigger list.
pub type TriggerId = usize;

/// A trigger shared between the runtime and the worker polling it.
pub type SharedTrigger = Arc<Mutex<Box<dyn Trigger>>>;

/// A trigger with its polling interval.
#[derive(Debug)]
pub struct ScheduledTrigger {
    pub trigger: Box<dyn Trigger>,
    pub interval: Duration,
}

impl ScheduledTrigger {
    pub fn new(trigger: Box<dyn Trigger>, interval: Duration) -> Self {
        Self { trigger, interval }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Poll every trigger once, then exit (used for `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from tickers, poll workers, etc.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// The interval of a trigger elapsed.
    TickElapsed { trigger: TriggerId },
    /// A queued poll finished.
    PollCompleted {
        trigger: TriggerId,
        verdict: PollVerdict,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use self::core::{CoreRuntime, TriggerSlot};
pub use event_handlers::{CoreCommand, CoreStep, FiredTrigger};
pub use queue::{PollJob, PollQueue};
pub use runtime::{RunSummary, Runtime};
