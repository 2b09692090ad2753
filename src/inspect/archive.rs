// src/inspect/archive.rs

//! Entry-listing comparison for zip/jar and tar (optionally gzipped) files.

use std::fmt::Write as _;
use std::io::{Cursor, Read};
use std::path::Path;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;
use crate::hash::compute_reader_hash;
use crate::inspect::{state_mismatch, ContentInspector, Evaluation, InspectorState};
use crate::poll_log::PollLog;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
}

impl ArchiveFormat {
    fn name(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
        }
    }
}

/// One archive member, as much as the format records about it.
///
/// `digest` is the stored CRC-32 for zip members and a BLAKE3 hash of the
/// member bytes for tar members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub modified: Option<i64>,
    pub is_dir: bool,
    pub mode: Option<u32>,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
    pub link_name: Option<String>,
    pub digest: String,
}

impl ArchiveEntry {
    /// Describe the first field that differs from `newer`, if any.
    fn first_difference(&self, newer: &ArchiveEntry) -> Option<String> {
        let name = &self.name;
        let what = if self.name != newer.name {
            return Some(format!("The name of the '{name}' entry has changed."));
        } else if self.size != newer.size {
            return Some(format!("The size of the entry '{name}' has changed."));
        } else if self.modified != newer.modified {
            "time"
        } else if self.is_dir != newer.is_dir {
            "type (file or directory)"
        } else if self.mode != newer.mode {
            "mode"
        } else if self.uid != newer.uid {
            "user id"
        } else if self.gid != newer.gid {
            "group id"
        } else if self.user_name != newer.user_name {
            "user name"
        } else if self.group_name != newer.group_name {
            "group name"
        } else if self.link_name != newer.link_name {
            "link name"
        } else if self.digest != newer.digest {
            "content"
        } else {
            return None;
        };
        Some(format!("The {what} of the '{name}' entry has changed."))
    }

    fn describe(&self) -> String {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        }
        format!(
            "[Name:{}, Size:{}, Time:{}, isDirectory:{}, Mode:{}, UserId:{}, UserName:{}, GroupId:{}, GroupName:{}, LinkName:{}, Digest:{}]",
            self.name,
            self.size,
            opt(&self.modified),
            self.is_dir,
            opt(&self.mode),
            opt(&self.uid),
            opt(&self.user_name),
            opt(&self.gid),
            opt(&self.group_name),
            opt(&self.link_name),
            self.digest
        )
    }
}

/// Compares the member listing of an archive between polls.
#[derive(Debug, Clone)]
pub struct ArchiveInspector {
    label: String,
    format: ArchiveFormat,
}

impl ArchiveInspector {
    pub fn new(label: impl Into<String>, format: ArchiveFormat) -> Self {
        Self {
            label: label.into(),
            format,
        }
    }

    fn read_entries(&self, fs: &dyn FileSystem, path: &Path) -> Result<Vec<ArchiveEntry>> {
        let bytes = fs.read(path)?;
        match self.format {
            ArchiveFormat::Zip => read_zip_entries(bytes, path),
            ArchiveFormat::Tar => read_tar_entries(bytes, path),
        }
    }

    fn listing_change(&self, old: &[ArchiveEntry], new: &[ArchiveEntry]) -> String {
        let mut out = format!("The content of the {} file has changed.\n", self.format.name());
        out.push_str("The old content is:\n");
        for entry in old {
            let _ = writeln!(out, "{}", entry.describe());
        }
        out.push_str("The new content is:\n");
        for entry in new {
            let _ = writeln!(out, "{}", entry.describe());
        }
        out
    }
}

impl ContentInspector for ArchiveInspector {
    fn label(&self) -> &str {
        &self.label
    }

    fn init_content(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState> {
        let entries = self.read_entries(fs, path)?;
        if self.format == ArchiveFormat::Tar && entries.is_empty() {
            return Err(FsTriggerError::Format("The tar file is empty.".to_string()));
        }
        Ok(InspectorState::Archive(entries))
    }

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let InspectorState::Archive(previous) = prior else {
            return Err(state_mismatch(self.label(), prior));
        };
        let current = self.read_entries(fs, path)?;

        let reason = if previous.len() != current.len() {
            Some(format!(
                "The number of entries of the {} file has changed ({} -> {}).",
                self.format.name(),
                previous.len(),
                current.len()
            ))
        } else {
            previous
                .iter()
                .zip(&current)
                .find_map(|(old, new)| old.first_difference(new))
        };

        let changed = reason.is_some();
        if let Some(reason) = reason {
            log.info(reason);
            log.info(self.listing_change(previous, &current));
        }
        Ok(Evaluation {
            changed,
            state: InspectorState::Archive(current),
        })
    }
}

fn format_error(path: &Path, format: ArchiveFormat, err: impl std::fmt::Display) -> FsTriggerError {
    FsTriggerError::Format(format!(
        "The file '{}' is not a readable {} archive: {err}",
        path.display(),
        format.name()
    ))
}

fn read_zip_entries(bytes: Vec<u8>, path: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format_error(path, ArchiveFormat::Zip, e))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive
            .by_index(index)
            .map_err(|e| format_error(path, ArchiveFormat::Zip, e))?;
        let modified = file.last_modified().and_then(|dt| {
            NaiveDate::from_ymd_opt(dt.year().into(), dt.month().into(), dt.day().into())
                .and_then(|d| d.and_hms_opt(dt.hour().into(), dt.minute().into(), dt.second().into()))
                .map(|t| t.and_utc().timestamp())
        });
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            size: file.size(),
            modified,
            is_dir: file.is_dir(),
            mode: file.unix_mode(),
            uid: None,
            gid: None,
            user_name: None,
            group_name: None,
            link_name: None,
            digest: format!("{:08x}", file.crc32()),
        });
    }
    Ok(entries)
}

fn read_tar_entries(bytes: Vec<u8>, path: &Path) -> Result<Vec<ArchiveEntry>> {
    let reader: Box<dyn Read> = if bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(Cursor::new(bytes)))
    } else {
        Box::new(Cursor::new(bytes))
    };
    let mut archive = tar::Archive::new(reader);
    let fail = |e: std::io::Error| format_error(path, ArchiveFormat::Tar, e);

    let mut entries = Vec::new();
    for entry in archive.entries().map_err(fail)? {
        let mut entry = entry.map_err(fail)?;
        let name = entry.path().map_err(fail)?.to_string_lossy().into_owned();
        let header = entry.header();
        let mut record = ArchiveEntry {
            name,
            size: header.size().map_err(fail)?,
            modified: header.mtime().ok().and_then(|t| i64::try_from(t).ok()),
            is_dir: header.entry_type().is_dir(),
            mode: header.mode().ok(),
            uid: header.uid().ok(),
            gid: header.gid().ok(),
            user_name: header.username().ok().flatten().map(str::to_string),
            group_name: header.groupname().ok().flatten().map(str::to_string),
            link_name: header
                .link_name()
                .ok()
                .flatten()
                .map(|p| p.to_string_lossy().into_owned()),
            digest: String::new(),
        };
        record.digest = compute_reader_hash(&mut entry).map_err(fail)?;
        entries.push(record);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .last_modified_time(zip::DateTime::from_date_and_time(2020, 1, 2, 3, 4, 6).unwrap());
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn tar_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_600_000_000);
            header.set_cksum();
            builder.append(&header, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn check(
        inspector: &ArchiveInspector,
        fs: &MockFileSystem,
        path: &str,
        state: &InspectorState,
    ) -> (Evaluation, PollLog) {
        let mut log = PollLog::new();
        let eval = inspector
            .evaluate(fs, Path::new(path), state, &mut log)
            .unwrap();
        (eval, log)
    }

    #[test]
    fn zip_unchanged_then_entry_added() {
        let fs = MockFileSystem::new();
        fs.add_file("/a.zip", zip_bytes(&[("one.txt", "1")]));
        let inspector = ArchiveInspector::new("zip", ArchiveFormat::Zip);
        let state = inspector.init(&fs, Path::new("/a.zip")).unwrap();

        let (same, _) = check(&inspector, &fs, "/a.zip", &state);
        assert!(!same.changed);

        fs.add_file("/a.zip", zip_bytes(&[("one.txt", "1"), ("two.txt", "2")]));
        let (added, log) = check(&inspector, &fs, "/a.zip", &same.state);
        assert!(added.changed);
        assert!(log.contains("The new content is:"));
    }

    #[test]
    fn zip_entry_size_change() {
        let fs = MockFileSystem::new();
        fs.add_file("/a.jar", zip_bytes(&[("one.txt", "1")]));
        let inspector = ArchiveInspector::new("jar", ArchiveFormat::Zip);
        let state = inspector.init(&fs, Path::new("/a.jar")).unwrap();

        fs.add_file("/a.jar", zip_bytes(&[("one.txt", "1234")]));
        let (eval, log) = check(&inspector, &fs, "/a.jar", &state);
        assert!(eval.changed);
        assert!(log.contains("The size of the entry 'one.txt' has changed."));
    }

    #[test]
    fn tar_content_change_with_same_size() {
        let fs = MockFileSystem::new();
        fs.add_file("/a.tar", tar_bytes(&[("one.txt", "aaaa")]));
        let inspector = ArchiveInspector::new("tar", ArchiveFormat::Tar);
        let state = inspector.init(&fs, Path::new("/a.tar")).unwrap();

        let (same, _) = check(&inspector, &fs, "/a.tar", &state);
        assert!(!same.changed);

        fs.add_file("/a.tar", tar_bytes(&[("one.txt", "bbbb")]));
        let (eval, log) = check(&inspector, &fs, "/a.tar", &same.state);
        assert!(eval.changed);
        assert!(log.contains("The content of the 'one.txt' entry has changed."));
    }

    #[test]
    fn gzipped_tar_is_read_transparently() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&tar_bytes(&[("one.txt", "x"), ("two.txt", "y")]))
            .unwrap();
        let fs = MockFileSystem::new();
        fs.add_file("/a.tar.gz", encoder.finish().unwrap());

        let inspector = ArchiveInspector::new("tar", ArchiveFormat::Tar);
        let state = inspector.init(&fs, Path::new("/a.tar.gz")).unwrap();
        let InspectorState::Archive(entries) = state else {
            panic!("unexpected state");
        };
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "two.txt"]);
    }

    #[test]
    fn empty_tar_is_a_format_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/empty.tar", tar_bytes(&[]));
        let inspector = ArchiveInspector::new("tar", ArchiveFormat::Tar);
        let err = inspector.init(&fs, Path::new("/empty.tar")).unwrap_err();
        assert!(matches!(err, FsTriggerError::Format(_)));
    }

    #[test]
    fn text_file_is_not_a_zip() {
        let fs = MockFileSystem::new();
        fs.add_file("/x.zip", "not an archive");
        let inspector = ArchiveInspector::new("zip", ArchiveFormat::Zip);
        let err = inspector.init(&fs, Path::new("/x.zip")).unwrap_err();
        assert!(matches!(err, FsTriggerError::Format(_)));
    }
}
