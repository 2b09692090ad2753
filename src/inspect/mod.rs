// src/inspect/mod.rs

//! Content inspectors.
//!
//! An inspector looks inside the resolved file and keeps its own state
//! between polls. [`ContentInspector::init`] computes the first state;
//! [`ContentInspector::evaluate`] recomputes it, compares it with the prior
//! one and returns both the verdict and the replacement state.
//!
//! States are plain data ([`InspectorState`]) so they can travel to and from
//! the host that owns the file. Variants are looked up by label through the
//! [`registry::InspectorRegistry`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;
use crate::poll_log::PollLog;

pub mod archive;
pub mod checksum;
pub(crate) mod keyed;
pub mod manifest;
pub mod properties;
pub mod registry;
pub mod text;
pub mod xml;

pub use archive::{ArchiveEntry, ArchiveFormat, ArchiveInspector};
pub use checksum::ChecksumInspector;
pub use manifest::{ManifestInspector, ManifestSource};
pub use properties::PropertiesInspector;
pub use registry::{InspectorConfig, InspectorRegistry};
pub use text::TextInspector;
pub use xml::XmlInspector;

/// Per-inspector memory carried from one poll to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InspectorState {
    /// Whole-file digest.
    Checksum(String),
    /// Tracked keys of a properties or manifest file.
    Keyed(BTreeMap<String, String>),
    /// Archive entries in stored order.
    Archive(Vec<ArchiveEntry>),
    /// XPath expression -> extracted value (`None` when nothing matched).
    Xml(BTreeMap<String, Option<String>>),
    /// Inspectors that keep no memory.
    Stateless,
}

impl InspectorState {
    pub fn kind(&self) -> &'static str {
        match self {
            InspectorState::Checksum(_) => "checksum",
            InspectorState::Keyed(_) => "keyed",
            InspectorState::Archive(_) => "archive",
            InspectorState::Xml(_) => "xml",
            InspectorState::Stateless => "stateless",
        }
    }
}

/// Result of [`ContentInspector::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub changed: bool,
    pub state: InspectorState,
}

/// A pluggable content comparison.
pub trait ContentInspector: Send + Sync + fmt::Debug {
    /// Registry label of this variant (e.g. `"zip"`).
    fn label(&self) -> &str;

    fn init_content(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState>;

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation>;

    /// Compute the first state. Fails if the file is missing or is not in
    /// the expected format.
    fn init(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState> {
        ensure_exists(fs, path)?;
        self.init_content(fs, path)
    }

    /// Recompute the state and compare it with `prior`.
    fn evaluate(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        ensure_exists(fs, path)?;
        self.evaluate_content(fs, path, prior, log)
    }
}

fn ensure_exists(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    if fs.exists(path) {
        Ok(())
    } else {
        Err(FsTriggerError::NotFound(path.to_path_buf()))
    }
}

/// Error for a prior state produced by a different inspector variant.
pub(crate) fn state_mismatch(label: &str, prior: &InspectorState) -> FsTriggerError {
    FsTriggerError::Format(format!(
        "the '{label}' inspector cannot compare against a '{}' state",
        prior.kind()
    ))
}
