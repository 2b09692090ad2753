// src/detect/inventory.rs

//! Whole-tree fingerprint scan used by folder triggers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::hash::compute_file_hash;
use crate::poll_log::PollLog;
use crate::resolve::{collect_matching, AntPatternSet};

/// What is remembered about one scanned path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Content digest; `None` for directories.
    pub fingerprint: Option<String>,
    pub last_modified: SystemTime,
}

/// Absolute path -> entry for everything a folder scan matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInventory {
    entries: HashMap<PathBuf, InventoryEntry>,
}

impl FileInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, entry: InventoryEntry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn get(&self, path: &Path) -> Option<&InventoryEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.entries.keys().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }
}

impl FromIterator<(PathBuf, InventoryEntry)> for FileInventory {
    fn from_iter<I: IntoIterator<Item = (PathBuf, InventoryEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Scan `directory` and fingerprint every matching entry.
///
/// Returns `Ok(None)` when the directory does not exist or is not a
/// directory. Directories are recorded (without fingerprint) only when
/// `track_directories` is set.
pub fn scan(
    fs: &dyn FileSystem,
    directory: &Path,
    patterns: &AntPatternSet,
    track_directories: bool,
    log: &mut PollLog,
) -> Result<Option<FileInventory>> {
    log.info(format!("Trying to monitor the folder '{}'", directory.display()));

    if !fs.is_dir(directory) {
        return Ok(None);
    }

    let mut inventory = FileInventory::new();
    for matched in collect_matching(fs, directory, patterns, track_directories)? {
        // A file removed between listing and hashing is simply skipped.
        if !fs.exists(&matched.path) {
            log.info(format!(
                "The file '{}' doesn't exist anymore",
                matched.path.display()
            ));
            continue;
        }
        let last_modified = fs.metadata(&matched.path)?.modified;
        let fingerprint = if matched.is_dir {
            None
        } else {
            Some(compute_file_hash(fs, &matched.path)?)
        };
        inventory.insert(
            matched.path,
            InventoryEntry {
                fingerprint,
                last_modified,
            },
        );
    }

    debug!(
        directory = %directory.display(),
        entries = inventory.len(),
        "folder scanned"
    );
    Ok(Some(inventory))
}
