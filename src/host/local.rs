// src/host/local.rs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{FsTriggerError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::host::{serve, Host, HostReply, HostRequest};
use crate::inspect::InspectorRegistry;

/// A host that runs requests in-process against a [`FileSystem`].
///
/// Used for the machine the engine runs on and, in tests, to stand in for
/// remote workers. The online flag is shared, so a test can take a host
/// down between two polls.
#[derive(Debug, Clone)]
pub struct LocalHost {
    id: String,
    labels: Vec<String>,
    fs: Arc<dyn FileSystem>,
    registry: InspectorRegistry,
    env: BTreeMap<String, String>,
    online: Arc<AtomicBool>,
}

impl LocalHost {
    /// The real filesystem with the process environment.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_fs(id, Arc::new(RealFileSystem)).with_env(std::env::vars())
    }

    /// Any filesystem, empty environment.
    pub fn with_fs(id: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            id: id.into(),
            labels: Vec::new(),
            fs,
            registry: InspectorRegistry::with_builtins(),
            env: BTreeMap::new(),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_registry(mut self, registry: InspectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Shared handle to the online flag.
    pub fn online_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.online)
    }
}

impl Host for LocalHost {
    fn id(&self) -> &str {
        &self.id
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn execute(&self, request: HostRequest) -> Result<HostReply> {
        if !self.is_online() {
            return Err(FsTriggerError::transport(&self.id, "host is offline"));
        }
        serve(self.fs.as_ref(), &self.registry, &self.env, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::poll_log::PollLog;

    #[test]
    fn offline_host_fails_with_transport_error() {
        let host = LocalHost::with_fs("w1", Arc::new(MockFileSystem::new()));
        host.set_online(false);
        let mut log = PollLog::new();
        let err = host.environment(&mut log).unwrap_err();
        assert!(matches!(err, FsTriggerError::Transport { .. }));

        host.set_online(true);
        assert!(host.environment(&mut log).unwrap().is_empty());
    }

    #[test]
    fn environment_is_served() {
        let host = LocalHost::with_fs("w1", Arc::new(MockFileSystem::new()))
            .with_env([("ROOT", "/data")]);
        let mut log = PollLog::new();
        let env = host.environment(&mut log).unwrap();
        assert_eq!(env.get("ROOT").map(String::as_str), Some("/data"));
    }
}
