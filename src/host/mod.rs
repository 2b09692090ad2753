// src/host/mod.rs

//! Execution hosts.
//!
//! A [`Host`] is a place where file operations can run: the local machine,
//! or a remote worker reached through some transport. The core never sends
//! closures; it sends a [`HostRequest`] and receives a [`HostReply`], so the
//! same detectors work with any transport that can carry these values.
//!
//! [`serve`] is the host-side handler: it runs a request against a
//! [`FileSystem`] and is what a transport calls on the far end.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::inventory::{scan, FileInventory};
use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;
use crate::inspect::{Evaluation, InspectorConfig, InspectorRegistry, InspectorState};
use crate::poll_log::PollLog;
use crate::resolve::{locate, AntPatternSet, LocatedFile};
use crate::types::Strategy;

pub mod local;

pub use local::LocalHost;

/// A unit of work to run on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostRequest {
    /// Environment variables used for macro expansion.
    Environment,
    Locate {
        directory: PathBuf,
        glob: String,
        strategy: Strategy,
    },
    Scan {
        directory: PathBuf,
        includes: String,
        excludes: Option<String>,
        track_directories: bool,
    },
    InspectInit {
        path: PathBuf,
        inspector: InspectorConfig,
    },
    InspectEvaluate {
        path: PathBuf,
        inspector: InspectorConfig,
        prior: InspectorState,
    },
}

impl HostRequest {
    fn name(&self) -> &'static str {
        match self {
            HostRequest::Environment => "environment",
            HostRequest::Locate { .. } => "locate",
            HostRequest::Scan { .. } => "scan",
            HostRequest::InspectInit { .. } => "inspect_init",
            HostRequest::InspectEvaluate { .. } => "inspect_evaluate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HostResponse {
    Environment(BTreeMap<String, String>),
    Located(Option<LocatedFile>),
    Scanned(Option<FileInventory>),
    Initialized(InspectorState),
    Evaluated(Evaluation),
}

/// Response plus the poll-log lines written on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReply {
    pub response: HostResponse,
    pub log: PollLog,
}

/// Something that can run a [`HostRequest`].
///
/// `execute` fails with [`FsTriggerError::Transport`] when the call itself
/// could not complete; failures of the computation (missing file, bad
/// format) come back as their own variants.
pub trait Host: Send + Sync + Debug {
    fn id(&self) -> &str;

    fn labels(&self) -> &[String];

    fn is_online(&self) -> bool;

    fn execute(&self, request: HostRequest) -> Result<HostReply>;

    fn has_label(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }

    /// Execute and fold the host's log lines into `log`.
    fn call(&self, request: HostRequest, log: &mut PollLog) -> Result<HostResponse> {
        let op = request.name();
        debug!(host = %self.id(), op, "host call");
        let reply = self.execute(request)?;
        log.append(reply.log);
        Ok(reply.response)
    }

    fn environment(&self, log: &mut PollLog) -> Result<BTreeMap<String, String>> {
        match self.call(HostRequest::Environment, log)? {
            HostResponse::Environment(env) => Ok(env),
            other => Err(unexpected(self.id(), "environment", &other)),
        }
    }

    fn locate(
        &self,
        directory: &Path,
        glob: &str,
        strategy: Strategy,
        log: &mut PollLog,
    ) -> Result<Option<LocatedFile>> {
        let request = HostRequest::Locate {
            directory: directory.to_path_buf(),
            glob: glob.to_string(),
            strategy,
        };
        match self.call(request, log)? {
            HostResponse::Located(found) => Ok(found),
            other => Err(unexpected(self.id(), "locate", &other)),
        }
    }

    fn scan(
        &self,
        directory: &Path,
        includes: &str,
        excludes: Option<&str>,
        track_directories: bool,
        log: &mut PollLog,
    ) -> Result<Option<FileInventory>> {
        let request = HostRequest::Scan {
            directory: directory.to_path_buf(),
            includes: includes.to_string(),
            excludes: excludes.map(str::to_string),
            track_directories,
        };
        match self.call(request, log)? {
            HostResponse::Scanned(inventory) => Ok(inventory),
            other => Err(unexpected(self.id(), "scan", &other)),
        }
    }

    fn inspect_init(
        &self,
        path: &Path,
        inspector: &InspectorConfig,
        log: &mut PollLog,
    ) -> Result<InspectorState> {
        let request = HostRequest::InspectInit {
            path: path.to_path_buf(),
            inspector: inspector.clone(),
        };
        match self.call(request, log)? {
            HostResponse::Initialized(state) => Ok(state),
            other => Err(unexpected(self.id(), "inspect_init", &other)),
        }
    }

    fn inspect_evaluate(
        &self,
        path: &Path,
        inspector: &InspectorConfig,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let request = HostRequest::InspectEvaluate {
            path: path.to_path_buf(),
            inspector: inspector.clone(),
            prior: prior.clone(),
        };
        match self.call(request, log)? {
            HostResponse::Evaluated(evaluation) => Ok(evaluation),
            other => Err(unexpected(self.id(), "inspect_evaluate", &other)),
        }
    }
}

fn unexpected(host: &str, op: &str, response: &HostResponse) -> FsTriggerError {
    FsTriggerError::transport(
        host,
        format!("unexpected response to {op}: {response:?}"),
    )
}

/// Run `request` against `fs`. This is the host side of every call.
pub fn serve(
    fs: &dyn FileSystem,
    registry: &InspectorRegistry,
    env: &BTreeMap<String, String>,
    request: HostRequest,
) -> Result<HostReply> {
    let mut log = PollLog::new();
    let response = match request {
        HostRequest::Environment => HostResponse::Environment(env.clone()),
        HostRequest::Locate {
            directory,
            glob,
            strategy,
        } => HostResponse::Located(locate(fs, &directory, &glob, strategy, &mut log)?),
        HostRequest::Scan {
            directory,
            includes,
            excludes,
            track_directories,
        } => {
            let patterns = AntPatternSet::from_specs(&includes, excludes.as_deref())?;
            HostResponse::Scanned(scan(fs, &directory, &patterns, track_directories, &mut log)?)
        }
        HostRequest::InspectInit { path, inspector } => {
            let inspector = registry.build(&inspector)?;
            HostResponse::Initialized(inspector.init(fs, &path)?)
        }
        HostRequest::InspectEvaluate {
            path,
            inspector,
            prior,
        } => {
            let inspector = registry.build(&inspector)?;
            HostResponse::Evaluated(inspector.evaluate(fs, &path, &prior, &mut log)?)
        }
    };
    Ok(HostReply { response, log })
}

/// Source of candidate hosts for target selection.
pub trait HostDirectory: Send + Sync + Debug {
    /// The host used when a trigger has no affinity label.
    fn local(&self) -> Arc<dyn Host>;

    /// Every host carrying `label`, in a stable order.
    fn with_label(&self, label: &str) -> Vec<Arc<dyn Host>>;
}

/// A fixed set of hosts, as declared in the config file.
#[derive(Debug, Clone)]
pub struct StaticHosts {
    local: Arc<dyn Host>,
    hosts: Vec<Arc<dyn Host>>,
}

impl StaticHosts {
    pub fn new(local: Arc<dyn Host>) -> Self {
        Self {
            local,
            hosts: Vec::new(),
        }
    }

    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.hosts.push(host);
        self
    }

    pub fn hosts(&self) -> &[Arc<dyn Host>] {
        &self.hosts
    }
}

impl HostDirectory for StaticHosts {
    fn local(&self) -> Arc<dyn Host> {
        Arc::clone(&self.local)
    }

    fn with_label(&self, label: &str) -> Vec<Arc<dyn Host>> {
        let mut matching: Vec<Arc<dyn Host>> = self
            .hosts
            .iter()
            .filter(|h| h.has_label(label))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id().cmp(b.id()));
        matching
    }
}
