// src/detect/mod.rs

//! Change detectors and the triggers built from them.
//!
//! - [`single_file`] tracks the one file a pattern resolves to.
//! - [`folder`] tracks the inventory of a directory subtree.
//! - [`availability`] is the offline/online state machine both share.
//!
//! A [`Trigger`] is what the engine schedules: a named group of detectors
//! polled together, producing one [`PollVerdict`] per cycle.

pub mod availability;
pub mod diff;
pub mod folder;
pub mod inventory;
pub mod single_file;

use std::fmt::Debug;

use tracing::{debug, warn};

use crate::errors::{FsTriggerError, Result};
use crate::inspect::InspectorRegistry;
use crate::poll_log::PollLog;
use crate::select::TargetSelector;
use crate::types::TriggerKind;

pub use availability::{HostAvailability, PollAction};
pub use diff::{diff, DiffOptions, SkipCheck};
pub use folder::{FolderDetector, FolderSpec};
pub use inventory::{FileInventory, InventoryEntry};
pub use single_file::{SingleFileDetector, Snapshot, TriggerSpec};

/// Outcome of one poll cycle of a trigger.
#[derive(Debug)]
pub struct PollVerdict {
    pub trigger: String,
    pub changed: bool,
    /// Cause string for the external scheduler, set when `changed`.
    pub cause: Option<&'static str>,
    pub log: PollLog,
    /// First failure of the cycle. A file trigger may report one next to a
    /// change detected by another of its entries.
    pub error: Option<FsTriggerError>,
}

impl PollVerdict {
    pub fn is_fatal(&self) -> bool {
        self.error.as_ref().is_some_and(FsTriggerError::is_fatal_config)
    }
}

/// A schedulable unit: started once, then polled repeatedly.
pub trait Trigger: Send + Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> TriggerKind;

    /// Record the initial state.
    fn start(&mut self, log: &mut PollLog) -> Result<()>;

    /// One poll cycle; `Ok(true)` when a change was detected.
    fn poll(&mut self, log: &mut PollLog) -> Result<bool>;

    /// One poll cycle that keeps the error next to a detected change.
    fn poll_cycle(&mut self, log: &mut PollLog) -> (bool, Option<FsTriggerError>) {
        match self.poll(log) {
            Ok(changed) => (changed, None),
            Err(err) => {
                log.error(format!("Polling error {err}"));
                (false, Some(err))
            }
        }
    }

    /// Run [`Trigger::poll_cycle`] and fold the result into a verdict.
    fn check(&mut self) -> PollVerdict {
        let mut log = PollLog::new();
        let (changed, error) = self.poll_cycle(&mut log);
        debug!(trigger = %self.name(), changed, failed = error.is_some(), "poll finished");
        PollVerdict {
            trigger: self.name().to_string(),
            changed,
            cause: changed.then(|| self.kind().cause()),
            log,
            error,
        }
    }
}

/// Watches an ordered list of file patterns.
#[derive(Debug)]
pub struct FileTrigger {
    name: String,
    detectors: Vec<SingleFileDetector>,
}

impl FileTrigger {
    pub fn new(
        name: impl Into<String>,
        entries: Vec<TriggerSpec>,
        selector: TargetSelector,
        registry: &InspectorRegistry,
    ) -> Result<Self> {
        let name = name.into();
        if entries.is_empty() {
            return Err(FsTriggerError::ConfigError(format!(
                "file trigger '{name}' has no entries"
            )));
        }
        let detectors = entries
            .into_iter()
            .map(|spec| SingleFileDetector::new(spec, selector.clone(), registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, detectors })
    }

    pub fn detectors(&self) -> &[SingleFileDetector] {
        &self.detectors
    }
}

impl Trigger for FileTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TriggerKind {
        TriggerKind::File
    }

    fn start(&mut self, log: &mut PollLog) -> Result<()> {
        let mut first_error = None;
        for detector in &mut self.detectors {
            if let Err(err) = detector.start(log) {
                warn!(trigger = %self.name, pattern = %detector.spec().pattern, error = %err, "start failed");
                log.error(format!("Polling error {err}"));
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Fails only when no entry changed; [`Trigger::check`] reports both.
    fn poll(&mut self, log: &mut PollLog) -> Result<bool> {
        match self.poll_cycle(log) {
            (false, Some(err)) => Err(err),
            (changed, _) => Ok(changed),
        }
    }

    /// Every detector is polled, so each refreshes its memory even once a
    /// change has been found.
    fn poll_cycle(&mut self, log: &mut PollLog) -> (bool, Option<FsTriggerError>) {
        let mut changed = false;
        let mut first_error = None;
        for detector in &mut self.detectors {
            match detector.poll(log) {
                Ok(true) => changed = true,
                Ok(false) => {}
                Err(err) => {
                    log.error(format!(
                        "Polling error for '{}': {err}",
                        detector.spec().pattern
                    ));
                    first_error.get_or_insert(err);
                }
            }
        }
        (changed, first_error)
    }
}

/// Watches one folder.
#[derive(Debug)]
pub struct FolderTrigger {
    name: String,
    detector: FolderDetector,
}

impl FolderTrigger {
    pub fn new(name: impl Into<String>, spec: FolderSpec, selector: TargetSelector) -> Result<Self> {
        let name = name.into();
        if spec.path.trim().is_empty() {
            return Err(FsTriggerError::ConfigError(format!(
                "folder trigger '{name}' has an empty path"
            )));
        }
        Ok(Self {
            name,
            detector: FolderDetector::new(spec, selector),
        })
    }

    pub fn detector(&self) -> &FolderDetector {
        &self.detector
    }
}

impl Trigger for FolderTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TriggerKind {
        TriggerKind::Folder
    }

    fn start(&mut self, log: &mut PollLog) -> Result<()> {
        self.detector.start(log)
    }

    fn poll(&mut self, log: &mut PollLog) -> Result<bool> {
        self.detector.poll(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::host::{Host, HostDirectory, LocalHost, StaticHosts};
    use crate::inspect::InspectorConfig;
    use crate::types::Strategy;
    use std::sync::Arc;

    fn selector(fs: Arc<MockFileSystem>) -> TargetSelector {
        let local: Arc<dyn Host> = Arc::new(LocalHost::with_fs("local", fs));
        let hosts: Arc<dyn HostDirectory> = Arc::new(StaticHosts::new(local));
        TargetSelector::new(hosts, None)
    }

    #[test]
    fn file_trigger_without_entries_is_rejected() {
        let fs = Arc::new(MockFileSystem::new());
        let err = FileTrigger::new("t", vec![], selector(fs), &InspectorRegistry::default())
            .unwrap_err();
        assert!(err.is_fatal_config());
    }

    #[test]
    fn every_entry_is_refreshed_when_one_changes() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/a/one.txt", "1");
        fs.add_file("/b/two.txt", "2");
        let entries = vec![
            TriggerSpec::new("/a/one.txt", Strategy::Ignore),
            TriggerSpec::new("/b/two.txt", Strategy::Ignore),
        ];
        let mut trigger =
            FileTrigger::new("pair", entries, selector(fs.clone()), &InspectorRegistry::default())
                .unwrap();

        let mut log = PollLog::new();
        trigger.start(&mut log).unwrap();

        fs.add_file("/a/one.txt", "1+");
        fs.add_file("/b/two.txt", "2+");
        let verdict = trigger.check();
        assert!(verdict.changed);
        assert_eq!(verdict.cause, Some("Triggered by a change to a file"));

        let verdict = trigger.check();
        assert!(!verdict.changed);
        assert!(verdict.error.is_none());
    }

    #[test]
    fn failing_entry_does_not_hide_a_change() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/a/one.txt", "1");
        fs.add_file("/b/app.properties", "k=v\n");
        let mut broken = TriggerSpec::new("/b/app.properties", Strategy::Ignore);
        broken.skip_modification_date = true;
        broken
            .inspectors
            .push(InspectorConfig::new("properties").with_all_keys());
        let entries = vec![TriggerSpec::new("/a/one.txt", Strategy::Ignore), broken];
        let mut trigger =
            FileTrigger::new("mixed", entries, selector(fs.clone()), &InspectorRegistry::default())
                .unwrap();

        let mut log = PollLog::new();
        trigger.start(&mut log).unwrap();

        fs.add_file("/b/app.properties", "");
        let verdict = trigger.check();
        assert!(!verdict.changed);
        assert!(verdict.error.is_some());
        assert!(!verdict.is_fatal());

        fs.add_file("/a/one.txt", "1+");
        let verdict = trigger.check();
        assert!(verdict.changed);
        assert!(verdict.error.is_some());
        assert!(verdict.log.contains("Polling error for '/b/app.properties'"));

        let mut log = PollLog::new();
        fs.add_file("/a/one.txt", "1++");
        assert!(trigger.poll(&mut log).unwrap());
    }

    #[test]
    fn config_error_is_reported_next_to_a_change() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/a/one.txt", "1");
        let entries = vec![
            TriggerSpec::new("one.txt", Strategy::Ignore),
            TriggerSpec::new("/a/one.txt", Strategy::Ignore),
        ];
        let mut trigger =
            FileTrigger::new("mixed", entries, selector(fs.clone()), &InspectorRegistry::default())
                .unwrap();

        let mut log = PollLog::new();
        let err = trigger.start(&mut log).unwrap_err();
        assert!(err.is_fatal_config());

        fs.add_file("/a/one.txt", "1+");
        let verdict = trigger.check();
        assert!(verdict.changed);
        assert!(verdict.is_fatal());
        assert_eq!(verdict.cause, Some("Triggered by a change to a file"));
        assert!(verdict.log.contains("Polling error for 'one.txt'"));
    }

    #[test]
    fn folder_trigger_reports_folder_cause() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/w/a.txt", "a");
        let mut trigger =
            FolderTrigger::new("w", FolderSpec::new("/w"), selector(fs.clone())).unwrap();

        let mut log = PollLog::new();
        trigger.start(&mut log).unwrap();
        assert!(log.contains("Trying to monitor the folder '/w'"));

        fs.add_file("/w/b.txt", "b");
        let verdict = trigger.check();
        assert!(verdict.changed);
        assert_eq!(verdict.cause, Some("Triggered by a change to a folder"));
        assert_eq!(verdict.trigger, "w");
    }
}
