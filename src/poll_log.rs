// src/poll_log.rs

//! Human-readable log of a single poll cycle.
//!
//! Every line is also forwarded to `tracing`, so the same text shows up in
//! the process log. Lines produced on a host travel back inside the host
//! reply and are appended with [`PollLog::append`] without being traced a
//! second time.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollLog {
    lines: Vec<String>,
}

impl PollLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "fstrigger::poll", "{message}");
        self.lines.push(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(target: "fstrigger::poll", "{message}");
        self.lines.push(format!("[ERROR] - {message}"));
    }

    /// Append lines that were already traced elsewhere (e.g. on a host).
    pub fn append(&mut self, other: PollLog) {
        self.lines.extend(other.lines);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// True if any line contains `needle`. Handy for assertions.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}
