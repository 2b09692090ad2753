// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::detect::{FolderSpec, SkipCheck, TriggerSpec};
use crate::inspect::InspectorConfig;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// vars = { ROOT = "/data" }
///
/// [[file]]
/// name = "drops"
/// interval = "30s"
///   [[file.entry]]
///   pattern = "${ROOT}/drops/*.zip"
///   strategy = "LATEST"
///
/// [[folder]]
/// name = "sources"
/// path = "${ROOT}/src"
/// includes = "**/*.rs"
/// ```
///
/// Every section is optional at this stage; validation requires at least
/// one trigger.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[[file]]` triggers.
    #[serde(default)]
    pub file: Vec<FileTriggerConfig>,

    /// `[[folder]]` triggers.
    #[serde(default)]
    pub folder: Vec<FolderTriggerConfig>,

    /// `[[host]]` declarations.
    #[serde(default)]
    pub host: Vec<HostConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Macro values layered over each host's environment.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

/// `[[file]]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTriggerConfig {
    pub name: String,

    /// Polling interval, e.g. `"30s"` or `"5m"`.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Affinity label; without one, polling happens on the local host.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub entry: Vec<FileEntryConfig>,
}

/// `[[file.entry]]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntryConfig {
    pub pattern: String,

    /// `"IGNORE"` or `"LATEST"`, checked during validation.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default)]
    pub skip_modification_date: bool,

    #[serde(default)]
    pub inspector: Vec<InspectorConfig>,
}

/// `[[folder]]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderTriggerConfig {
    pub name: String,

    #[serde(default = "default_interval")]
    pub interval: String,

    #[serde(default)]
    pub label: Option<String>,

    pub path: String,

    #[serde(default)]
    pub includes: Option<String>,

    #[serde(default)]
    pub excludes: Option<String>,

    #[serde(default)]
    pub track_directories: bool,

    /// Checks to leave out of the comparison.
    #[serde(default)]
    pub skip: Vec<SkipCheck>,
}

/// `[[host]]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub id: String,

    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_strategy() -> String {
    "IGNORE".to_string()
}

/// A validated file trigger.
#[derive(Debug, Clone)]
pub struct FileTriggerDef {
    pub name: String,
    pub interval: Duration,
    pub label: Option<String>,
    pub entries: Vec<TriggerSpec>,
}

/// A validated folder trigger.
#[derive(Debug, Clone)]
pub struct FolderTriggerDef {
    pub name: String,
    pub interval: Duration,
    pub label: Option<String>,
    pub spec: FolderSpec,
}

/// Validated configuration.
///
/// Only built through `TryFrom<RawConfigFile>`, so everything in here has
/// already been checked.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    vars: BTreeMap<String, String>,
    files: Vec<FileTriggerDef>,
    folders: Vec<FolderTriggerDef>,
    hosts: Vec<HostConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        vars: BTreeMap<String, String>,
        files: Vec<FileTriggerDef>,
        folders: Vec<FolderTriggerDef>,
        hosts: Vec<HostConfig>,
    ) -> Self {
        Self {
            vars,
            files,
            folders,
            hosts,
        }
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn files(&self) -> &[FileTriggerDef] {
        &self.files
    }

    pub fn folders(&self) -> &[FolderTriggerDef] {
        &self.folders
    }

    pub fn hosts(&self) -> &[HostConfig] {
        &self.hosts
    }

    pub fn trigger_count(&self) -> usize {
        self.files.len() + self.folders.len()
    }
}
