// src/inspect/manifest.rs

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;
use crate::inspect::keyed::{compare_maps, KeySelection};
use crate::inspect::{
    state_mismatch, ContentInspector, Evaluation, InspectorConfig, InspectorState,
};
use crate::poll_log::PollLog;

const JAR_MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Where the manifest text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    /// The resolved file is itself a manifest.
    File,
    /// The resolved file is a jar carrying `META-INF/MANIFEST.MF`.
    Jar,
}

/// Main-section attribute comparison of a manifest.
#[derive(Debug, Clone)]
pub struct ManifestInspector {
    source: ManifestSource,
    selection: KeySelection,
}

impl ManifestInspector {
    pub fn from_config(source: ManifestSource, config: &InspectorConfig) -> Self {
        let selection = KeySelection::from_config(config);
        Self { source, selection }
    }

    fn manifest_text(&self, fs: &dyn FileSystem, path: &Path) -> Result<String> {
        let bytes = match self.source {
            ManifestSource::File => fs.read(path)?,
            ManifestSource::Jar => read_jar_manifest(fs, path)?,
        };
        String::from_utf8(bytes).map_err(|_| {
            FsTriggerError::Format(format!(
                "The file '{}' doesn't contain any MANIFEST file",
                path.display()
            ))
        })
    }

    fn compute(&self, fs: &dyn FileSystem, path: &Path) -> Result<BTreeMap<String, String>> {
        let text = self.manifest_text(fs, path)?;
        let attributes = parse_main_attributes(&text).map_err(|reason| {
            FsTriggerError::Format(format!(
                "The file '{}' doesn't contain any MANIFEST file ({reason})",
                path.display()
            ))
        })?;
        self.selection.select(attributes, path, "attribute")
    }
}

impl ContentInspector for ManifestInspector {
    fn label(&self) -> &str {
        match self.source {
            ManifestSource::File => "manifest",
            ManifestSource::Jar => "jar-manifest",
        }
    }

    fn init_content(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState> {
        Ok(InspectorState::Keyed(self.compute(fs, path)?))
    }

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let InspectorState::Keyed(previous) = prior else {
            return Err(state_mismatch(self.label(), prior));
        };
        let current = self.compute(fs, path)?;
        let changed = compare_maps(previous, &current, "attribute", log);
        Ok(Evaluation {
            changed,
            state: InspectorState::Keyed(current),
        })
    }
}

fn read_jar_manifest(fs: &dyn FileSystem, path: &Path) -> Result<Vec<u8>> {
    let not_found = || {
        FsTriggerError::Format(format!(
            "The file '{}' doesn't contain any MANIFEST file",
            path.display()
        ))
    };
    let mut archive = ZipArchive::new(Cursor::new(fs.read(path)?)).map_err(|_| not_found())?;
    let mut entry = archive.by_name(JAR_MANIFEST_PATH).map_err(|_| not_found())?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Parse the main section of a manifest: `Name: value` headers up to the
/// first blank line, with single-space continuation lines.
pub fn parse_main_attributes(text: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut attributes = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(continued) = line.strip_prefix(' ') {
            match current.as_mut() {
                Some((_, value)) => value.push_str(continued),
                None => return Err("continuation line without a header".to_string()),
            }
            continue;
        }
        let (name, value) = line
            .split_once(": ")
            .ok_or_else(|| format!("invalid header field '{line}'"))?;
        if name.is_empty() {
            return Err("empty header name".to_string());
        }
        if let Some((n, v)) = current.replace((name.to_string(), value.to_string())) {
            attributes.insert(n, v);
        }
    }
    if let Some((n, v)) = current {
        attributes.insert(n, v);
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const MANIFEST: &str = "Manifest-Version: 1.0\nCreated-By: fstrigger\nImplementation-Version: 1.2\n  .3\n\nName: section\nIgnored: yes\n";

    fn jar_with_manifest(manifest: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(JAR_MANIFEST_PATH, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(manifest.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn main_section_with_continuations() {
        let attrs = parse_main_attributes(MANIFEST).unwrap();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs["Implementation-Version"], "1.2 .3");
        assert!(!attrs.contains_key("Ignored"));
    }

    #[test]
    fn plain_text_is_not_a_manifest() {
        assert!(parse_main_attributes("just some text\n").is_err());
    }

    #[test]
    fn source_manifest_attribute_change() {
        let fs = MockFileSystem::new();
        fs.add_file("/MANIFEST.MF", MANIFEST);
        let path = Path::new("/MANIFEST.MF");
        let inspector = ManifestInspector::from_config(
            ManifestSource::File,
            &InspectorConfig::new("manifest").with_all_keys(),
        );

        let state = inspector.init(&fs, path).unwrap();
        fs.add_file("/MANIFEST.MF", MANIFEST.replace("fstrigger", "someone"));
        let mut log = PollLog::new();
        let eval = inspector.evaluate(&fs, path, &state, &mut log).unwrap();
        assert!(eval.changed);
        assert!(log.contains("Created-By"));
    }

    #[test]
    fn jar_manifest_is_read_from_the_archive() {
        let fs = MockFileSystem::new();
        fs.add_file("/app.jar", jar_with_manifest(MANIFEST));
        let path = Path::new("/app.jar");
        let inspector = ManifestInspector::from_config(
            ManifestSource::Jar,
            &InspectorConfig::new("jar-manifest").with_keys("Manifest-Version"),
        );

        let state = inspector.init(&fs, path).unwrap();
        let InspectorState::Keyed(map) = &state else {
            panic!("unexpected state {state:?}");
        };
        assert_eq!(map.len(), 1);

        fs.add_file(
            "/app.jar",
            jar_with_manifest(&MANIFEST.replace("1.0", "2.0")),
        );
        let mut log = PollLog::new();
        assert!(inspector.evaluate(&fs, path, &state, &mut log).unwrap().changed);
    }

    #[test]
    fn jar_without_manifest_is_a_format_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/not-a.jar", "plain bytes");
        let inspector = ManifestInspector::from_config(
            ManifestSource::Jar,
            &InspectorConfig::new("jar-manifest").with_all_keys(),
        );
        let err = inspector.init(&fs, Path::new("/not-a.jar")).unwrap_err();
        assert!(matches!(err, FsTriggerError::Format(_)));
    }
}
