// src/inspect/registry.rs

//! Label -> constructor table for content inspectors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{FsTriggerError, Result};
use crate::inspect::{
    ArchiveFormat, ArchiveInspector, ChecksumInspector, ContentInspector, ManifestInspector,
    ManifestSource, PropertiesInspector, TextInspector, XmlInspector,
};

/// Configuration of one inspector as written in the config file.
///
/// Only the fields relevant to `kind` are read; the rest stay at their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InspectorConfig {
    /// Registry label, e.g. `"properties"` or `"tar"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Comma separated key/attribute names (properties, manifest).
    #[serde(default)]
    pub keys: Option<String>,

    /// Track every key instead of `keys` (properties, manifest).
    #[serde(default)]
    pub all_keys: bool,

    /// XPath expressions (xml).
    #[serde(default)]
    pub expressions: Vec<String>,

    /// Line regexes (text).
    #[serde(default)]
    pub regexes: Vec<String>,
}

impl InspectorConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            keys: None,
            all_keys: false,
            expressions: Vec::new(),
            regexes: Vec::new(),
        }
    }

    pub fn with_keys(mut self, keys: impl Into<String>) -> Self {
        self.keys = Some(keys.into());
        self
    }

    pub fn with_all_keys(mut self) -> Self {
        self.all_keys = true;
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expressions.push(expression.into());
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regexes.push(regex.into());
        self
    }
}

pub type InspectorFactory =
    Arc<dyn Fn(&InspectorConfig) -> Result<Box<dyn ContentInspector>> + Send + Sync>;

/// Set of known inspector variants, keyed by label.
#[derive(Clone)]
pub struct InspectorRegistry {
    factories: BTreeMap<String, InspectorFactory>,
}

impl fmt::Debug for InspectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectorRegistry")
            .field("labels", &self.labels())
            .finish()
    }
}

impl Default for InspectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl InspectorRegistry {
    /// A registry with no variants at all.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with every built-in variant.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("checksum", |_| Ok(Box::new(ChecksumInspector)));
        registry.register("properties", |cfg| {
            Ok(Box::new(PropertiesInspector::from_config(cfg)))
        });
        registry.register("manifest", |cfg| {
            Ok(Box::new(ManifestInspector::from_config(
                ManifestSource::File,
                cfg,
            )))
        });
        registry.register("jar-manifest", |cfg| {
            Ok(Box::new(ManifestInspector::from_config(
                ManifestSource::Jar,
                cfg,
            )))
        });
        registry.register("zip", |_| {
            Ok(Box::new(ArchiveInspector::new("zip", ArchiveFormat::Zip)))
        });
        registry.register("jar", |_| {
            Ok(Box::new(ArchiveInspector::new("jar", ArchiveFormat::Zip)))
        });
        registry.register("tar", |_| {
            Ok(Box::new(ArchiveInspector::new("tar", ArchiveFormat::Tar)))
        });
        registry.register("xml", |cfg| Ok(Box::new(XmlInspector::from_config(cfg)?)));
        registry.register("text", |cfg| Ok(Box::new(TextInspector::from_config(cfg)?)));
        registry
    }

    /// Add or replace the variant registered under `label`.
    pub fn register<F>(&mut self, label: impl Into<String>, factory: F)
    where
        F: Fn(&InspectorConfig) -> Result<Box<dyn ContentInspector>> + Send + Sync + 'static,
    {
        self.factories.insert(label.into(), Arc::new(factory));
    }

    pub fn contains(&self, label: &str) -> bool {
        self.factories.contains_key(label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the inspector described by `config`.
    pub fn build(&self, config: &InspectorConfig) -> Result<Box<dyn ContentInspector>> {
        let factory = self.factories.get(&config.kind).ok_or_else(|| {
            FsTriggerError::ConfigError(format!(
                "unknown inspector type '{}' (known: {})",
                config.kind,
                self.labels().join(", ")
            ))
        })?;
        factory(config)
    }
}
