// src/detect/folder.rs

//! Change detection for a directory subtree.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::detect::availability::{HostAvailability, PollAction};
use crate::detect::diff::{diff, DiffOptions, SkipCheck};
use crate::detect::inventory::FileInventory;
use crate::errors::Result;
use crate::poll_log::PollLog;
use crate::resolve::{expand_macros, DEFAULT_INCLUDES};
use crate::select::{Selection, TargetSelector};
use crate::types::Stage;

/// A watched folder and the checks applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSpec {
    pub path: String,
    /// Comma separated Ant patterns; [`DEFAULT_INCLUDES`] when unset.
    pub includes: Option<String>,
    pub excludes: Option<String>,
    pub track_directories: bool,
    pub skip: Vec<SkipCheck>,
}

impl FolderSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            includes: None,
            excludes: None,
            track_directories: false,
            skip: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Memory {
    Uninitialized,
    Absent,
    Present(FileInventory),
}

#[derive(Debug)]
struct Scanned {
    directory: PathBuf,
    inventory: FileInventory,
}

/// Detects changes among the files of a folder.
#[derive(Debug)]
pub struct FolderDetector {
    spec: FolderSpec,
    selector: TargetSelector,
    options: DiffOptions,
    availability: HostAvailability,
    memory: Memory,
}

impl FolderDetector {
    pub fn new(spec: FolderSpec, selector: TargetSelector) -> Self {
        let options = DiffOptions::skipping(&spec.skip);
        Self {
            spec,
            selector,
            options,
            availability: HostAvailability::default(),
            memory: Memory::Uninitialized,
        }
    }

    pub fn spec(&self) -> &FolderSpec {
        &self.spec
    }

    pub fn availability(&self) -> HostAvailability {
        self.availability
    }

    /// Inventory recorded by the last committed poll.
    pub fn inventory(&self) -> Option<&FileInventory> {
        match &self.memory {
            Memory::Present(inventory) => Some(inventory),
            _ => None,
        }
    }

    pub fn start(&mut self, log: &mut PollLog) -> Result<()> {
        let selection = self.select(Stage::Startup, log)?;
        self.availability = HostAvailability::on_startup(selection.is_reachable());
        self.memory = match selection {
            Selection::Unreachable => Memory::Uninitialized,
            Selection::NotFound => Memory::Absent,
            Selection::Found { value, .. } => Memory::Present(value.inventory),
        };
        Ok(())
    }

    pub fn poll(&mut self, log: &mut PollLog) -> Result<bool> {
        let selection = self.select(Stage::Check, log)?;
        let (next, action) = self.availability.on_check(selection.is_reachable());
        debug!(folder = %self.spec.path, ?action, ?next, "folder poll");

        let (changed, memory) = match (action, selection) {
            (PollAction::Hold, _) => {
                log.info("No host is available. Waiting for the next schedule, the previous state is kept.");
                self.availability = next;
                return Ok(false);
            }
            (PollAction::Reset, _) => {
                log.info("No host was available at startup and none is available now.");
                (false, Memory::Absent)
            }
            (PollAction::AdoptBaseline, selection) => {
                log.info("No host was available at startup. Waiting for the next schedule to check if there are modifications.");
                (false, Self::baseline(selection))
            }
            (PollAction::Compare, selection) => match (&self.memory, selection) {
                (Memory::Uninitialized, selection) => {
                    log.info("No previous state was recorded. Taking the current state as reference.");
                    (false, Self::baseline(selection))
                }
                (_, Selection::Found { value, .. }) => {
                    let previous = match &self.memory {
                        Memory::Present(inventory) => Some(inventory),
                        _ => None,
                    };
                    let changed = diff(
                        previous,
                        &value.inventory,
                        self.options,
                        &value.directory,
                        log,
                    );
                    (changed, Memory::Present(value.inventory))
                }
                (_, _) => {
                    log.info(format!("The directory '{}' doesn't exist.", self.spec.path));
                    (false, Memory::Absent)
                }
            },
        };

        self.memory = memory;
        self.availability = next;
        Ok(changed)
    }

    fn baseline(selection: Selection<Scanned>) -> Memory {
        match selection {
            Selection::Found { value, .. } => Memory::Present(value.inventory),
            _ => Memory::Absent,
        }
    }

    fn select(&self, stage: Stage, log: &mut PollLog) -> Result<Selection<Scanned>> {
        let spec = &self.spec;
        self.selector.select(stage, log, |selector, host, log| {
            let values = selector.macro_values(host, log)?;
            let directory = PathBuf::from(expand_macros(&spec.path, &values));
            let includes = spec
                .includes
                .as_deref()
                .map(|i| expand_macros(i, &values))
                .unwrap_or_else(|| DEFAULT_INCLUDES.to_string());
            let excludes = spec.excludes.as_deref().map(|e| expand_macros(e, &values));

            let inventory = host.scan(
                Path::new(&directory),
                &includes,
                excludes.as_deref(),
                spec.track_directories,
                log,
            )?;
            Ok(inventory.map(|inventory| Scanned {
                directory,
                inventory,
            }))
        })
    }
}
