// src/config/validate.rs

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use tracing::warn;

use crate::config::model::{
    ConfigFile, FileEntryConfig, FileTriggerConfig, FileTriggerDef, FolderTriggerConfig,
    FolderTriggerDef, HostConfig, RawConfigFile,
};
use crate::detect::{FolderSpec, TriggerSpec};
use crate::errors::{FsTriggerError, Result};
use crate::inspect::keyed::KeySelection;
use crate::inspect::InspectorRegistry;
use crate::types::Strategy;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FsTriggerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw, &InspectorRegistry::with_builtins())
    }
}

/// Validate `cfg` against `registry` and build the checked config.
pub fn validate_raw_config(cfg: &RawConfigFile, registry: &InspectorRegistry) -> Result<ConfigFile> {
    ensure_has_triggers(cfg)?;
    ensure_unique_names(cfg)?;
    ensure_hosts(&cfg.host)?;

    let known_labels: BTreeSet<&str> = cfg
        .host
        .iter()
        .flat_map(|h| h.labels.iter().map(String::as_str))
        .collect();
    let check_label = |trigger: &str, label: &Option<String>| -> Result<()> {
        match label {
            Some(label) if !cfg.host.is_empty() && !known_labels.contains(label.as_str()) => {
                Err(FsTriggerError::ConfigError(format!(
                    "trigger '{trigger}' uses label '{label}' which no [[host]] carries"
                )))
            }
            _ => Ok(()),
        }
    };

    let mut files = Vec::with_capacity(cfg.file.len());
    for file in &cfg.file {
        check_label(&file.name, &file.label)?;
        files.push(validate_file_trigger(file, registry)?);
    }

    let mut folders = Vec::with_capacity(cfg.folder.len());
    for folder in &cfg.folder {
        check_label(&folder.name, &folder.label)?;
        folders.push(validate_folder_trigger(folder)?);
    }

    Ok(ConfigFile::new_unchecked(
        cfg.config.vars.clone(),
        files,
        folders,
        cfg.host.clone(),
    ))
}

fn ensure_has_triggers(cfg: &RawConfigFile) -> Result<()> {
    if cfg.file.is_empty() && cfg.folder.is_empty() {
        return Err(FsTriggerError::ConfigError(
            "config must contain at least one [[file]] or [[folder]] section".to_string(),
        ));
    }
    Ok(())
}

fn ensure_unique_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    let names = cfg
        .file
        .iter()
        .map(|f| f.name.as_str())
        .chain(cfg.folder.iter().map(|f| f.name.as_str()));
    for name in names {
        if name.trim().is_empty() {
            return Err(FsTriggerError::ConfigError(
                "trigger names must not be empty".to_string(),
            ));
        }
        if !seen.insert(name) {
            return Err(FsTriggerError::ConfigError(format!(
                "trigger name '{name}' is used more than once"
            )));
        }
    }
    Ok(())
}

fn ensure_hosts(hosts: &[HostConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for host in hosts {
        if host.id.trim().is_empty() {
            return Err(FsTriggerError::ConfigError(
                "[[host]] id must not be empty".to_string(),
            ));
        }
        if !seen.insert(host.id.as_str()) {
            return Err(FsTriggerError::ConfigError(format!(
                "host id '{}' is declared more than once",
                host.id
            )));
        }
    }
    Ok(())
}

fn validate_file_trigger(
    file: &FileTriggerConfig,
    registry: &InspectorRegistry,
) -> Result<FileTriggerDef> {
    let interval = interval_of(&file.name, &file.interval)?;
    if file.entry.is_empty() {
        return Err(FsTriggerError::ConfigError(format!(
            "file trigger '{}' must contain at least one [[file.entry]]",
            file.name
        )));
    }

    let entries = file
        .entry
        .iter()
        .map(|entry| validate_entry(&file.name, entry, registry))
        .collect::<Result<Vec<_>>>()?;

    Ok(FileTriggerDef {
        name: file.name.clone(),
        interval,
        label: file.label.clone(),
        entries,
    })
}

fn validate_entry(
    trigger: &str,
    entry: &FileEntryConfig,
    registry: &InspectorRegistry,
) -> Result<TriggerSpec> {
    if entry.pattern.trim().is_empty() {
        return Err(FsTriggerError::ConfigError(format!(
            "file trigger '{trigger}' has an entry with an empty pattern"
        )));
    }

    let strategy: Strategy = entry.strategy.parse().map_err(|e: String| {
        FsTriggerError::ConfigError(format!("file trigger '{trigger}': {e}"))
    })?;

    for inspector in &entry.inspector {
        registry.build(inspector).map_err(|e| {
            FsTriggerError::ConfigError(format!(
                "file trigger '{trigger}', pattern '{}': {e}",
                entry.pattern
            ))
        })?;
        // Reported here once; the inspectors themselves are rebuilt every poll.
        if matches!(inspector.kind.as_str(), "properties" | "manifest" | "jar-manifest")
            && KeySelection::from_config(inspector).is_noop()
        {
            warn!(
                trigger,
                pattern = %entry.pattern,
                inspector = %inspector.kind,
                "no keys and all_keys = false; this inspector never reports a change"
            );
        }
    }

    let mut spec = TriggerSpec::new(entry.pattern.clone(), strategy);
    spec.skip_modification_date = entry.skip_modification_date;
    spec.inspectors = entry.inspector.clone();
    Ok(spec)
}

fn validate_folder_trigger(folder: &FolderTriggerConfig) -> Result<FolderTriggerDef> {
    let interval = interval_of(&folder.name, &folder.interval)?;
    if folder.path.trim().is_empty() {
        return Err(FsTriggerError::ConfigError(format!(
            "folder trigger '{}' has an empty path",
            folder.name
        )));
    }

    Ok(FolderTriggerDef {
        name: folder.name.clone(),
        interval,
        label: folder.label.clone(),
        spec: FolderSpec {
            path: folder.path.clone(),
            includes: folder.includes.clone().filter(|s| !s.trim().is_empty()),
            excludes: folder.excludes.clone().filter(|s| !s.trim().is_empty()),
            track_directories: folder.track_directories,
            skip: folder.skip.clone(),
        },
    })
}

fn interval_of(trigger: &str, raw: &str) -> Result<Duration> {
    let interval = parse_duration(raw).map_err(|e| {
        FsTriggerError::ConfigError(format!("trigger '{trigger}' has an invalid interval: {e}"))
    })?;
    if interval.is_zero() {
        return Err(FsTriggerError::ConfigError(format!(
            "trigger '{trigger}' has a zero interval"
        )));
    }
    Ok(interval)
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
