//! A scripted set of in-memory hosts.
//!
//! Every host is a [`LocalHost`] over its own [`MockFileSystem`], so tests
//! can edit files per host and take hosts offline between two polls.

use std::collections::BTreeMap;
use std::sync::Arc;

use fstrigger::fs::mock::MockFileSystem;
use fstrigger::host::{Host, HostDirectory, LocalHost, StaticHosts};
use fstrigger::select::TargetSelector;

pub const LOCAL: &str = "local";

#[derive(Debug)]
struct FakeHost {
    host: Arc<LocalHost>,
    fs: Arc<MockFileSystem>,
}

/// A local host plus any number of labelled workers.
#[derive(Debug)]
pub struct FakeCluster {
    hosts: BTreeMap<String, FakeHost>,
}

impl FakeCluster {
    /// Only the local host, online, with an empty filesystem.
    pub fn new() -> Self {
        let mut cluster = Self {
            hosts: BTreeMap::new(),
        };
        cluster.insert(LOCAL, &[]);
        cluster
    }

    /// Add a worker carrying `labels`.
    pub fn with_worker(mut self, id: &str, labels: &[&str]) -> Self {
        self.insert(id, labels);
        self
    }

    fn insert(&mut self, id: &str, labels: &[&str]) {
        let fs = Arc::new(MockFileSystem::new());
        let host = Arc::new(LocalHost::with_fs(id, fs.clone()).with_labels(labels.iter().copied()));
        self.hosts.insert(id.to_string(), FakeHost { host, fs });
    }

    /// Filesystem of `id`. Panics on unknown ids.
    pub fn fs(&self, id: &str) -> Arc<MockFileSystem> {
        self.entry(id).fs.clone()
    }

    pub fn local_fs(&self) -> Arc<MockFileSystem> {
        self.fs(LOCAL)
    }

    pub fn set_online(&self, id: &str, online: bool) {
        self.entry(id).host.set_online(online);
    }

    /// Take every host offline (or back online).
    pub fn set_all_online(&self, online: bool) {
        for fake in self.hosts.values() {
            fake.host.set_online(online);
        }
    }

    pub fn directory(&self) -> Arc<dyn HostDirectory> {
        let local: Arc<dyn Host> = self.entry(LOCAL).host.clone();
        let mut directory = StaticHosts::new(local);
        for (id, fake) in &self.hosts {
            if id != LOCAL {
                directory = directory.with_host(fake.host.clone());
            }
        }
        Arc::new(directory)
    }

    /// Selector for triggers with the given affinity label.
    pub fn selector(&self, label: Option<&str>) -> TargetSelector {
        TargetSelector::new(self.directory(), label.map(str::to_string))
    }

    fn entry(&self, id: &str) -> &FakeHost {
        self.hosts
            .get(id)
            .unwrap_or_else(|| panic!("unknown fake host '{id}'"))
    }
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}
