// src/inspect/keyed.rs

//! Key/value comparison shared by the properties and manifest inspectors.

use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{FsTriggerError, Result};
use crate::inspect::InspectorConfig;
use crate::poll_log::PollLog;

const KEY_SEPARATOR: char = ',';

/// Which keys of a parsed file are tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeySelection {
    all_keys: bool,
    keys: Vec<String>,
}

impl KeySelection {
    pub(crate) fn from_config(config: &InspectorConfig) -> Self {
        let keys = config
            .keys
            .as_deref()
            .map(|raw| {
                raw.split(KEY_SEPARATOR)
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            all_keys: config.all_keys,
            keys,
        }
    }

    /// True when nothing can ever be tracked.
    pub(crate) fn is_noop(&self) -> bool {
        !self.all_keys && self.keys.is_empty()
    }

    /// Validate the full map and narrow it down to the tracked keys.
    pub(crate) fn select(
        &self,
        all: BTreeMap<String, String>,
        path: &Path,
        noun: &str,
    ) -> Result<BTreeMap<String, String>> {
        if all.is_empty() {
            return Err(FsTriggerError::Format(format!(
                "The '{}' has no {noun}s",
                path.display()
            )));
        }
        if let Some((key, _)) = all.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(FsTriggerError::Format(format!(
                "The '{}' has a blank value for the {noun} '{key}'",
                path.display()
            )));
        }

        if self.all_keys {
            return Ok(all);
        }
        Ok(all
            .into_iter()
            .filter(|(k, _)| self.keys.iter().any(|wanted| wanted == k))
            .collect())
    }
}

/// Compare two tracked maps; logs the first difference found.
pub(crate) fn compare_maps(
    previous: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
    noun: &str,
    log: &mut PollLog,
) -> bool {
    if previous.len() != current.len() {
        log.info(format!(
            "The new content file contains {} {noun}(s) whereas the previous content contains {} {noun}(s)",
            current.len(),
            previous.len()
        ));
        return true;
    }

    for (key, value) in previous {
        match current.get(key) {
            None => {
                log.info(format!("The {noun} '{key}' is not longer available."));
                return true;
            }
            Some(new_value) if new_value != value => {
                log.info(format!(
                    "The previous value for the {noun} '{key}' was '{value}' but it's now '{new_value}'."
                ));
                return true;
            }
            Some(_) => {}
        }
    }
    false
}
