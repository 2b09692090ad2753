// src/detect/single_file.rs

//! Change detection for one tracked file pattern.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::detect::availability::{HostAvailability, PollAction};
use crate::errors::Result;
use crate::host::Host;
use crate::inspect::{InspectorConfig, InspectorRegistry, InspectorState};
use crate::poll_log::PollLog;
use crate::resolve::{resolve, LocatedFile};
use crate::select::{ResolvedTarget, Selection, TargetSelector};
use crate::types::{Stage, Strategy};

/// One tracked file pattern and how to compare it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub pattern: String,
    pub strategy: Strategy,
    /// Ignore modification time and rely on identity and inspectors only.
    pub skip_modification_date: bool,
    /// Applied in order; the first one reporting a change wins.
    pub inspectors: Vec<InspectorConfig>,
}

impl TriggerSpec {
    pub fn new(pattern: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            pattern: pattern.into(),
            strategy,
            skip_modification_date: false,
            inspectors: Vec::new(),
        }
    }
}

/// Identity and modification time of the last resolved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub target: ResolvedTarget,
    pub last_modified: SystemTime,
}

impl Snapshot {
    pub fn path(&self) -> &PathBuf {
        &self.target.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileMemory {
    snapshot: Snapshot,
    states: Vec<InspectorState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Memory {
    /// Nothing recorded yet: the next resolution becomes the baseline.
    Uninitialized,
    /// The previous poll found no file.
    Absent,
    Present(FileMemory),
}

/// Detects changes of the single file a [`TriggerSpec`] resolves to.
#[derive(Debug)]
pub struct SingleFileDetector {
    spec: TriggerSpec,
    selector: TargetSelector,
    availability: HostAvailability,
    memory: Memory,
}

impl SingleFileDetector {
    /// Fails with a config error if an inspector cannot be built.
    pub fn new(
        spec: TriggerSpec,
        selector: TargetSelector,
        registry: &InspectorRegistry,
    ) -> Result<Self> {
        for inspector in &spec.inspectors {
            registry.build(inspector)?;
        }
        Ok(Self {
            spec,
            selector,
            availability: HostAvailability::default(),
            memory: Memory::Uninitialized,
        })
    }

    pub fn spec(&self) -> &TriggerSpec {
        &self.spec
    }

    pub fn availability(&self) -> HostAvailability {
        self.availability
    }

    /// The file recorded by the last committed poll, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.memory {
            Memory::Present(m) => Some(&m.snapshot),
            _ => None,
        }
    }

    /// Record the initial baseline.
    ///
    /// On error nothing is recorded and the next successful poll adopts a
    /// baseline instead of reporting a change.
    pub fn start(&mut self, log: &mut PollLog) -> Result<()> {
        let selection = self.select(Stage::Startup, log)?;
        self.availability = HostAvailability::on_startup(selection.is_reachable());
        self.memory = match selection {
            Selection::Unreachable => Memory::Uninitialized,
            Selection::NotFound => Memory::Absent,
            Selection::Found { host, value } => self.capture(host.as_ref(), &value, None, log)?,
        };
        Ok(())
    }

    /// One poll cycle. Memory is only replaced when the cycle succeeds.
    pub fn poll(&mut self, log: &mut PollLog) -> Result<bool> {
        let selection = self.select(Stage::Check, log)?;
        let (next, action) = self.availability.on_check(selection.is_reachable());
        debug!(pattern = %self.spec.pattern, ?action, ?next, "single file poll");

        let (changed, memory) = match action {
            PollAction::Hold => {
                log.info("No host is available. Waiting for the next schedule, the previous state is kept.");
                self.availability = next;
                return Ok(false);
            }
            PollAction::Reset => {
                log.info("No host was available at startup and none is available now.");
                (false, Memory::Absent)
            }
            PollAction::AdoptBaseline => {
                log.info("No host was available at startup. Waiting for the next schedule to check if there are modifications.");
                (false, self.baseline(selection, log)?)
            }
            PollAction::Compare => match self.memory {
                Memory::Uninitialized => {
                    log.info("No previous state was recorded. Taking the current state as reference.");
                    (false, self.baseline(selection, log)?)
                }
                _ => self.compare(selection, log)?,
            },
        };

        self.memory = memory;
        self.availability = next;
        Ok(changed)
    }

    fn select(&self, stage: Stage, log: &mut PollLog) -> Result<Selection<LocatedFile>> {
        let pattern = &self.spec.pattern;
        let strategy = self.spec.strategy;
        self.selector.select(stage, log, |selector, host, log| {
            let values = selector.macro_values(host, log)?;
            let parts = resolve(pattern, &values)?;
            log.info(format!(
                "Monitoring the file pattern '{}/{}'",
                parts.directory.trim_end_matches('/'),
                parts.glob
            ));
            host.locate(Path::new(&parts.directory), &parts.glob, strategy, log)
        })
    }

    fn baseline(&self, selection: Selection<LocatedFile>, log: &mut PollLog) -> Result<Memory> {
        match selection {
            Selection::Found { host, value } => self.capture(host.as_ref(), &value, None, log),
            _ => Ok(Memory::Absent),
        }
    }

    /// Build a complete memory for `file`, reusing already evaluated states.
    fn capture(
        &self,
        host: &dyn Host,
        file: &LocatedFile,
        evaluated: Option<Vec<Option<InspectorState>>>,
        log: &mut PollLog,
    ) -> Result<Memory> {
        let mut evaluated = evaluated.unwrap_or_default();
        evaluated.resize(self.spec.inspectors.len(), None);

        let mut states = Vec::with_capacity(self.spec.inspectors.len());
        for (config, known) in self.spec.inspectors.iter().zip(evaluated) {
            let state = match known {
                Some(state) => state,
                None => host.inspect_init(&file.path, config, log)?,
            };
            states.push(state);
        }

        Ok(Memory::Present(FileMemory {
            snapshot: Snapshot {
                target: ResolvedTarget {
                    host_id: host.id().to_string(),
                    path: file.path.clone(),
                },
                last_modified: file.modified,
            },
            states,
        }))
    }

    fn compare(
        &self,
        selection: Selection<LocatedFile>,
        log: &mut PollLog,
    ) -> Result<(bool, Memory)> {
        let (host, file) = match selection {
            Selection::Found { host, value } => (host, value),
            _ => {
                log.info("The computed file doesn't exist.");
                return Ok((false, Memory::Absent));
            }
        };

        let previous = match &self.memory {
            Memory::Present(previous) => previous,
            _ => {
                log.info("The file didn't exist for the previous polling and now it exists.");
                return Ok((true, self.capture(host.as_ref(), &file, None, log)?));
            }
        };

        if previous.snapshot.target.path != file.path {
            log.info("The current polling file has changed.");
            return Ok((true, self.capture(host.as_ref(), &file, None, log)?));
        }

        if !self.spec.skip_modification_date && previous.snapshot.last_modified != file.modified {
            log.info(format!(
                "The last modification date of the file '{}' has changed.",
                file.path.display()
            ));
            log.info(format!(
                "The last date/time was   {}",
                format_time(previous.snapshot.last_modified)
            ));
            log.info(format!(
                "The current date/time is {}",
                format_time(file.modified)
            ));
            return Ok((true, self.capture(host.as_ref(), &file, None, log)?));
        }

        let (changed, evaluated) =
            self.evaluate_inspectors(host.as_ref(), &file.path, previous, log)?;
        Ok((changed, self.capture(host.as_ref(), &file, Some(evaluated), log)?))
    }

    /// Run inspectors in order until one reports a change.
    fn evaluate_inspectors(
        &self,
        host: &dyn Host,
        path: &Path,
        previous: &FileMemory,
        log: &mut PollLog,
    ) -> Result<(bool, Vec<Option<InspectorState>>)> {
        let mut evaluated = Vec::with_capacity(self.spec.inspectors.len());
        if self.spec.inspectors.is_empty() {
            return Ok((false, evaluated));
        }

        log.info(format!("Inspecting the contents of '{}'", path.display()));
        for (index, config) in self.spec.inspectors.iter().enumerate() {
            let Some(prior) = previous.states.get(index) else {
                warn!(inspector = %config.kind, "no prior state; re-initialising");
                log.info("No modifications according the given criteria.");
                evaluated.push(None);
                continue;
            };
            let evaluation = host.inspect_evaluate(path, config, prior, log)?;
            evaluated.push(Some(evaluation.state));
            if evaluation.changed {
                return Ok((true, evaluated));
            }
        }
        Ok((false, evaluated))
    }
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%b %d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::host::{HostDirectory, LocalHost, StaticHosts};
    use std::sync::Arc;
    use std::time::Duration;

    fn detector(fs: Arc<MockFileSystem>, spec: TriggerSpec) -> SingleFileDetector {
        let local: Arc<dyn Host> = Arc::new(LocalHost::with_fs("local", fs));
        let hosts: Arc<dyn HostDirectory> = Arc::new(StaticHosts::new(local));
        SingleFileDetector::new(
            spec,
            TargetSelector::new(hosts, None),
            &InspectorRegistry::with_builtins(),
        )
        .unwrap()
    }

    #[test]
    fn unchanged_file_is_not_a_change() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/data/a.log", "a");
        let mut det = detector(fs, TriggerSpec::new("/data/*.log", Strategy::Ignore));

        let mut log = PollLog::new();
        det.start(&mut log).unwrap();
        assert!(!det.poll(&mut log).unwrap());
        assert_eq!(
            det.snapshot().map(|s| s.path().clone()),
            Some(PathBuf::from("/data/a.log"))
        );
    }

    #[test]
    fn modification_time_change_unless_skipped() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/data/a.log", "a");
        let mut det = detector(fs.clone(), TriggerSpec::new("/data/a.log", Strategy::Ignore));
        let mut skipping = {
            let mut spec = TriggerSpec::new("/data/a.log", Strategy::Ignore);
            spec.skip_modification_date = true;
            detector(fs.clone(), spec)
        };

        let mut log = PollLog::new();
        det.start(&mut log).unwrap();
        skipping.start(&mut log).unwrap();

        fs.set_modified("/data/a.log", SystemTime::UNIX_EPOCH + Duration::from_secs(5));
        assert!(det.poll(&mut log).unwrap());
        assert!(log.contains("The last modification date of the file"));
        assert!(!skipping.poll(&mut log).unwrap());
    }

    #[test]
    fn appearing_file_is_a_change_and_disappearing_is_not() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_dir("/data");
        let mut det = detector(fs.clone(), TriggerSpec::new("/data/*.log", Strategy::Ignore));

        let mut log = PollLog::new();
        det.start(&mut log).unwrap();
        assert!(det.snapshot().is_none());

        fs.add_file("/data/a.log", "a");
        assert!(det.poll(&mut log).unwrap());
        assert!(log.contains("didn't exist for the previous polling"));

        fs.remove("/data/a.log");
        assert!(!det.poll(&mut log).unwrap());
        assert!(det.snapshot().is_none());
    }

    #[test]
    fn inspector_failure_keeps_previous_memory() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/conf/app.properties", "a=1\n");
        let mut spec = TriggerSpec::new("/conf/app.properties", Strategy::Ignore);
        spec.skip_modification_date = true;
        spec.inspectors
            .push(InspectorConfig::new("properties").with_all_keys());
        let mut det = detector(fs.clone(), spec);

        let mut log = PollLog::new();
        det.start(&mut log).unwrap();
        let before = det.memory.clone();

        fs.add_file("/conf/app.properties", "# nothing left\n");
        assert!(det.poll(&mut log).is_err());
        assert_eq!(det.memory, before);

        fs.add_file("/conf/app.properties", "a=2\n");
        assert!(det.poll(&mut log).unwrap());
    }

    #[test]
    fn first_changed_inspector_short_circuits_and_others_are_refreshed() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/conf/app.properties", "a=1\nb=1\n");
        let mut spec = TriggerSpec::new("/conf/app.properties", Strategy::Ignore);
        spec.skip_modification_date = true;
        spec.inspectors = vec![
            InspectorConfig::new("properties").with_keys("a"),
            InspectorConfig::new("checksum"),
        ];
        let mut det = detector(fs.clone(), spec);

        let mut log = PollLog::new();
        det.start(&mut log).unwrap();

        fs.add_file("/conf/app.properties", "a=2\nb=1\n");
        assert!(det.poll(&mut log).unwrap());
        // checksum state was re-initialised on the new content
        assert!(!det.poll(&mut log).unwrap());
    }
}
