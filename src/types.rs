use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Policy for resolving several glob matches down to one file.
///
/// - `Ignore`: more than one match means "nothing to poll this cycle".
/// - `Latest`: pick the most recently modified match.
///
/// Values are case-sensitive (`IGNORE`, `LATEST`), matching the config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Strategy {
    Ignore,
    Latest,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IGNORE" => Ok(Strategy::Ignore),
            "LATEST" => Ok(Strategy::Latest),
            other => Err(format!(
                "invalid strategy: {other} (expected \"IGNORE\" or \"LATEST\")"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Ignore => f.write_str("IGNORE"),
            Strategy::Latest => f.write_str("LATEST"),
        }
    }
}

/// Which poll stage asked for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Trigger start-up (first baseline).
    Startup,
    /// A regular scheduled check.
    Check,
}

/// Kind of trigger; each kind has its own single-worker poll queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerKind {
    File,
    Folder,
}

impl TriggerKind {
    /// Cause string handed to the scheduler when a trigger of this kind fires.
    pub fn cause(self) -> &'static str {
        match self {
            TriggerKind::File => "Triggered by a change to a file",
            TriggerKind::Folder => "Triggered by a change to a folder",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::File => f.write_str("file"),
            TriggerKind::Folder => f.write_str("folder"),
        }
    }
}
