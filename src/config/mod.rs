// src/config/mod.rs

//! Configuration loading and validation for fstrigger.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate triggers, durations, strategies and inspectors (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str, DEFAULT_CONFIG_FILE};
pub use model::{
    ConfigFile, ConfigSection, FileEntryConfig, FileTriggerConfig, FileTriggerDef,
    FolderTriggerConfig, FolderTriggerDef, HostConfig, RawConfigFile,
};
pub use validate::parse_duration;
