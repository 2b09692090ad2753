#![allow(dead_code)]

use fstrigger::detect::{FolderSpec, SkipCheck, TriggerSpec};
use fstrigger::inspect::InspectorConfig;
use fstrigger::types::Strategy;

/// Builder for `TriggerSpec` to simplify test setup.
pub struct TriggerSpecBuilder {
    spec: TriggerSpec,
}

impl TriggerSpecBuilder {
    /// `IGNORE` strategy, modification time checked, no inspectors.
    pub fn new(pattern: &str) -> Self {
        Self {
            spec: TriggerSpec::new(pattern, Strategy::Ignore),
        }
    }

    pub fn latest(mut self) -> Self {
        self.spec.strategy = Strategy::Latest;
        self
    }

    pub fn skip_modification_date(mut self) -> Self {
        self.spec.skip_modification_date = true;
        self
    }

    pub fn inspector(mut self, inspector: InspectorConfig) -> Self {
        self.spec.inspectors.push(inspector);
        self
    }

    pub fn build(self) -> TriggerSpec {
        self.spec
    }
}

/// Builder for `FolderSpec`.
pub struct FolderSpecBuilder {
    spec: FolderSpec,
}

impl FolderSpecBuilder {
    pub fn new(path: &str) -> Self {
        Self {
            spec: FolderSpec::new(path),
        }
    }

    pub fn includes(mut self, includes: &str) -> Self {
        self.spec.includes = Some(includes.to_string());
        self
    }

    pub fn excludes(mut self, excludes: &str) -> Self {
        self.spec.excludes = Some(excludes.to_string());
        self
    }

    pub fn track_directories(mut self) -> Self {
        self.spec.track_directories = true;
        self
    }

    pub fn skip(mut self, check: SkipCheck) -> Self {
        self.spec.skip.push(check);
        self
    }

    pub fn build(self) -> FolderSpec {
        self.spec
    }
}
