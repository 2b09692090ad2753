// src/select.rs

//! Choosing the host(s) a detector runs its file operations on.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::errors::Result;
use crate::host::{Host, HostDirectory};
use crate::poll_log::PollLog;
use crate::types::Stage;

/// Where and what was found this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub host_id: String,
    pub path: PathBuf,
}

/// Outcome of [`TargetSelector::select`].
pub enum Selection<T> {
    /// `host` produced `value`; later calls for this cycle go to the same host.
    Found { host: Arc<dyn Host>, value: T },
    /// At least one host answered but none had anything.
    NotFound,
    /// No candidate host was reachable.
    Unreachable,
}

impl<T: fmt::Debug> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Found { host, value } => f
                .debug_struct("Found")
                .field("host", &host.id())
                .field("value", value)
                .finish(),
            Selection::NotFound => f.write_str("NotFound"),
            Selection::Unreachable => f.write_str("Unreachable"),
        }
    }
}

impl<T> Selection<T> {
    pub fn is_reachable(&self) -> bool {
        !matches!(self, Selection::Unreachable)
    }
}

/// Picks candidate hosts for a trigger and queries them in order.
///
/// Without an affinity label the local host is the only candidate. With a
/// label, every online host carrying it is tried in id order, stopping at
/// the first one whose lookup returns something.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    hosts: Arc<dyn HostDirectory>,
    label: Option<String>,
    vars: BTreeMap<String, String>,
}

impl TargetSelector {
    pub fn new(hosts: Arc<dyn HostDirectory>, label: Option<String>) -> Self {
        Self {
            hosts,
            label,
            vars: BTreeMap::new(),
        }
    }

    /// Extra macro values layered over each host's environment.
    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Macro values for `host`: its environment, overridden by configured vars.
    pub fn macro_values(&self, host: &dyn Host, log: &mut PollLog) -> Result<BTreeMap<String, String>> {
        let mut values = host.environment(log)?;
        values.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(values)
    }

    fn candidates(&self, log: &mut PollLog) -> Vec<Arc<dyn Host>> {
        let all = match &self.label {
            None => {
                log.info("Polling on the local host.");
                vec![self.hosts.local()]
            }
            Some(label) => {
                log.info(format!(
                    "Polling on all hosts for the label '{label}' attached to the trigger."
                ));
                self.hosts.with_label(label)
            }
        };
        all.into_iter().filter(|h| h.is_online()).collect()
    }

    /// Run `lookup` on each candidate until one yields a value.
    ///
    /// Errors from a lookup abort the selection.
    pub fn select<T, F>(&self, stage: Stage, log: &mut PollLog, mut lookup: F) -> Result<Selection<T>>
    where
        F: FnMut(&TargetSelector, &dyn Host, &mut PollLog) -> Result<Option<T>>,
    {
        let candidates = self.candidates(log);
        if candidates.is_empty() {
            log.info(match stage {
                Stage::Startup => "All hosts are offline at startup.",
                Stage::Check => "All hosts are offline.",
            });
            return Ok(Selection::Unreachable);
        }

        for host in candidates {
            if self.label.is_some() {
                log.info(format!("Polling on the host '{}'", host.id()));
            }
            if let Some(value) = lookup(self, host.as_ref(), log)? {
                debug!(host = %host.id(), ?stage, "target found");
                return Ok(Selection::Found { host, value });
            }
        }

        if let Some(label) = &self.label {
            log.info(format!(
                "Nothing was found on the hosts with the label '{label}'."
            ));
        }
        Ok(Selection::NotFound)
    }
}
