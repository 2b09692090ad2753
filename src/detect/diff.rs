// src/detect/diff.rs

//! Comparison of two folder inventories.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detect::inventory::FileInventory;
use crate::poll_log::PollLog;

/// Checks that a folder trigger can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCheck {
    /// More or fewer files.
    Count,
    ModificationDate,
    Fingerprint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    pub check_count: bool,
    pub check_modification_date: bool,
    pub check_fingerprint: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            check_count: true,
            check_modification_date: true,
            check_fingerprint: true,
        }
    }
}

impl DiffOptions {
    pub fn skipping(skips: &[SkipCheck]) -> Self {
        let mut options = Self::default();
        for skip in skips {
            match skip {
                SkipCheck::Count => options.check_count = false,
                SkipCheck::ModificationDate => options.check_modification_date = false,
                SkipCheck::Fingerprint => options.check_fingerprint = false,
            }
        }
        options
    }
}

/// Decide whether `new` differs from `old`.
///
/// `old == None` means no inventory was remembered (first appearance of the
/// folder). The first difference found is logged and ends the comparison.
pub fn diff(
    old: Option<&FileInventory>,
    new: &FileInventory,
    options: DiffOptions,
    folder: &Path,
    log: &mut PollLog,
) -> bool {
    let Some(old) = old else {
        if new.is_empty() {
            log.info(format!(
                "The folder '{}' does not contain any files matching the includes/excludes information.",
                folder.display()
            ));
            return false;
        }
        log.info(format!(
            "The folder '{}' contains new files matching the includes/excludes information.",
            folder.display()
        ));
        return true;
    };

    if options.check_count && old.len() != new.len() {
        log.info(format!(
            "The folder '{}' content has changed ({} -> {} entries).",
            folder.display(),
            old.len(),
            new.len()
        ));
        return true;
    }

    for path in old.paths() {
        let Some(current) = new.get(path) else {
            log.info(format!("The path '{}' doesn't exist anymore.", path.display()));
            return true;
        };
        let Some(previous) = old.get(path) else {
            continue;
        };

        if options.check_fingerprint {
            if let (Some(before), Some(after)) = (&previous.fingerprint, &current.fingerprint) {
                if before != after {
                    log.info(format!("The contents of '{}' have changed.", path.display()));
                    return true;
                }
            }
        }

        if options.check_modification_date && previous.last_modified != current.last_modified {
            log.info(format!(
                "The modification date of '{}' has changed.",
                path.display()
            ));
            return true;
        }
    }

    if let Some(added) = new.paths().into_iter().find(|p| !old.contains(p)) {
        log.info(format!("The path '{}' is new.", added.display()));
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::inventory::InventoryEntry;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn entry(hash: &str, secs: u64) -> InventoryEntry {
        InventoryEntry {
            fingerprint: Some(hash.to_string()),
            last_modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    fn inventory(items: &[(&str, &str, u64)]) -> FileInventory {
        items
            .iter()
            .map(|(p, h, t)| (PathBuf::from(p), entry(h, *t)))
            .collect()
    }

    fn changed(old: &FileInventory, new: &FileInventory, options: DiffOptions) -> bool {
        let mut log = PollLog::new();
        diff(Some(old), new, options, Path::new("/w"), &mut log)
    }

    #[test]
    fn removal_and_addition_are_changes() {
        let base = inventory(&[("/w/a", "h1", 1), ("/w/b", "h2", 1)]);
        let removed = inventory(&[("/w/a", "h1", 1)]);
        let added = inventory(&[("/w/a", "h1", 1), ("/w/b", "h2", 1), ("/w/c", "h3", 1)]);

        assert!(changed(&base, &removed, DiffOptions::default()));
        assert!(changed(&base, &added, DiffOptions::default()));
        assert!(!changed(&base, &base.clone(), DiffOptions::default()));
    }

    #[test]
    fn added_path_is_seen_without_the_count_check() {
        let base = inventory(&[("/w/a", "h1", 1)]);
        let swapped = inventory(&[("/w/a", "h1", 1), ("/w/z", "h9", 1)]);
        let options = DiffOptions::skipping(&[SkipCheck::Count]);
        assert!(changed(&base, &swapped, options));
    }

    #[test]
    fn skipped_checks_are_ignored() {
        let base = inventory(&[("/w/a", "h1", 1)]);
        let touched = inventory(&[("/w/a", "h1", 2)]);
        let edited = inventory(&[("/w/a", "h2", 1)]);

        assert!(changed(&base, &touched, DiffOptions::default()));
        assert!(!changed(
            &base,
            &touched,
            DiffOptions::skipping(&[SkipCheck::ModificationDate])
        ));
        assert!(changed(&base, &edited, DiffOptions::default()));
        assert!(!changed(
            &base,
            &edited,
            DiffOptions::skipping(&[SkipCheck::Fingerprint])
        ));
    }

    #[test]
    fn first_inventory_with_files_is_a_change() {
        let mut log = PollLog::new();
        let new = inventory(&[("/w/a", "h1", 1)]);
        assert!(diff(None, &new, DiffOptions::default(), Path::new("/w"), &mut log));
        assert!(!diff(
            None,
            &FileInventory::new(),
            DiffOptions::default(),
            Path::new("/w"),
            &mut log
        ));
    }
}
