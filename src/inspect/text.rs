// src/inspect/text.rs

use std::path::Path;

use regex::Regex;

use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;
use crate::inspect::{ContentInspector, Evaluation, InspectorConfig, InspectorState};
use crate::poll_log::PollLog;

/// Fires whenever a line of the file fully matches one of the regexes.
///
/// Keeps no memory: a matching line re-triggers on every poll.
#[derive(Debug, Clone)]
pub struct TextInspector {
    patterns: Vec<(String, Regex)>,
}

impl TextInspector {
    pub fn from_config(config: &InspectorConfig) -> Result<Self> {
        if config.regexes.is_empty() {
            return Err(FsTriggerError::ConfigError(
                "You have to provide a pattern for the text inspector".to_string(),
            ));
        }
        let patterns = config
            .regexes
            .iter()
            .map(|raw| {
                Regex::new(&format!("^(?:{raw})$"))
                    .map(|re| (raw.clone(), re))
                    .map_err(|e| {
                        FsTriggerError::ConfigError(format!("invalid regex '{raw}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }
}

impl ContentInspector for TextInspector {
    fn label(&self) -> &str {
        "text"
    }

    fn init_content(&self, _fs: &dyn FileSystem, _path: &Path) -> Result<InspectorState> {
        Ok(InspectorState::Stateless)
    }

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        _prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let bytes = fs.read(path)?;
        let text = String::from_utf8_lossy(&bytes);

        let hit = text.lines().find_map(|line| {
            self.patterns
                .iter()
                .find(|(_, re)| re.is_match(line))
                .map(|(raw, _)| (line, raw))
        });
        if let Some((line, raw)) = hit {
            log.info(format!("The line '{line}' matches the pattern '{raw}'"));
        }

        Ok(Evaluation {
            changed: hit.is_some(),
            state: InspectorState::Stateless,
        })
    }
}
