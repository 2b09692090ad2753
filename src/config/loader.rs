// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Name of the config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "FSTrigger.toml";

/// Deserialize TOML text. No semantic checks.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Read and deserialize the file at `path`. No semantic checks; see
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = parse_str(&contents)?;
    debug!(
        path = %path.display(),
        files = config.file.len(),
        folders = config.folder.len(),
        hosts = config.host.len(),
        "config parsed"
    );
    Ok(config)
}

/// Read, deserialize and validate the file at `path`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let config = ConfigFile::try_from(load_from_path(path)?)?;
    info!(
        path = %path.display(),
        triggers = config.trigger_count(),
        "config loaded"
    );
    Ok(config)
}

/// [`DEFAULT_CONFIG_FILE`] in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
