// src/inspect/checksum.rs

use std::path::Path;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::hash::compute_file_hash;
use crate::inspect::{state_mismatch, ContentInspector, Evaluation, InspectorState};
use crate::poll_log::PollLog;

/// Whole-file digest comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumInspector;

impl ContentInspector for ChecksumInspector {
    fn label(&self) -> &str {
        "checksum"
    }

    fn init_content(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState> {
        Ok(InspectorState::Checksum(compute_file_hash(fs, path)?))
    }

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let InspectorState::Checksum(previous) = prior else {
            return Err(state_mismatch(self.label(), prior));
        };
        let current = compute_file_hash(fs, path)?;
        let changed = *previous != current;
        if changed {
            log.info(format!(
                "The content of the file '{}' has changed.",
                path.display()
            ));
        }
        Ok(Evaluation {
            changed,
            state: InspectorState::Checksum(current),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FsTriggerError;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn single_byte_flip_is_a_change() {
        let fs = MockFileSystem::new();
        fs.add_file("/f.bin", vec![0u8, 1, 2, 3]);
        let path = Path::new("/f.bin");

        let state = ChecksumInspector.init(&fs, path).unwrap();
        let mut log = PollLog::new();
        let same = ChecksumInspector.evaluate(&fs, path, &state, &mut log).unwrap();
        assert!(!same.changed);

        fs.add_file("/f.bin", vec![0u8, 1, 2, 4]);
        let flipped = ChecksumInspector
            .evaluate(&fs, path, &same.state, &mut log)
            .unwrap();
        assert!(flipped.changed);
        assert!(log.contains("The content of the file '/f.bin' has changed."));
    }

    #[test]
    fn missing_file_is_not_found() {
        let fs = MockFileSystem::new();
        let err = ChecksumInspector.init(&fs, Path::new("/nope")).unwrap_err();
        assert!(matches!(err, FsTriggerError::NotFound(_)));
    }
}
