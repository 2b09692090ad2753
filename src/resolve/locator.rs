// src/resolve/locator.rs

//! Resolving a directory + glob to at most one concrete file on one host.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::poll_log::PollLog;
use crate::resolve::patterns::{collect_matching, AntPatternSet};
use crate::types::Strategy;

/// A concrete file found by [`locate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Find the single file selected by `glob` inside `directory`.
///
/// Returns `Ok(None)` (with an explanatory log line) when the directory is
/// missing, nothing matches, or several files match under
/// [`Strategy::Ignore`]. Under [`Strategy::Latest`] the most recently
/// modified match wins; ties go to the lexically smallest path.
pub fn locate(
    fs: &dyn FileSystem,
    directory: &Path,
    glob: &str,
    strategy: Strategy,
    log: &mut PollLog,
) -> Result<Option<LocatedFile>> {
    if !fs.exists(directory) {
        log.info(format!(
            "The folder path '{}' doesn't exist.",
            directory.display()
        ));
        return Ok(None);
    }

    let patterns = AntPatternSet::new(vec![glob.to_string()], &[])?;
    let matches = collect_matching(fs, directory, &patterns, false)?;

    match matches.len() {
        0 => {
            log.info(format!(
                "There is no matching files in the folder '{}' for the fileName '{}'.",
                directory.display(),
                glob
            ));
            Ok(None)
        }
        1 => {
            let path = matches[0].path.clone();
            let modified = fs.metadata(&path)?.modified;
            log.info(format!("Checking one file: '{}'.", path.display()));
            Ok(Some(LocatedFile { path, modified }))
        }
        n => {
            log.info(format!(
                "There is more than one file ({n}) for the file pattern '{}/{}'.",
                directory.display(),
                glob
            ));
            match strategy {
                Strategy::Ignore => {
                    log.info("According to the checked strategy, the schedule has been ignored.");
                    Ok(None)
                }
                Strategy::Latest => {
                    log.info(
                        "According to the checked strategy, the latest modified file has been selected for the polling.",
                    );
                    let mut latest: Option<LocatedFile> = None;
                    // `matches` is sorted, so keeping the first maximum gives
                    // the lexically smallest path among equal timestamps.
                    for candidate in matches {
                        let modified = fs.metadata(&candidate.path)?.modified;
                        let newer = latest.as_ref().is_none_or(|cur| modified > cur.modified);
                        if newer {
                            latest = Some(LocatedFile {
                                path: candidate.path,
                                modified,
                            });
                        }
                    }
                    if let Some(file) = &latest {
                        log.info(format!(
                            "The selected file to poll is '{}'.",
                            file.path.display()
                        ));
                    }
                    Ok(latest)
                }
            }
        }
    }
}
