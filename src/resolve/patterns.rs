// src/resolve/patterns.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;

/// Include pattern applied when a folder trigger does not set one.
pub const DEFAULT_INCLUDES: &str = "**/*.*";

/// Compiled Ant-style include/exclude patterns.
///
/// Patterns are matched against paths relative to the scanned directory,
/// using forward slashes:
/// - `*` and `?` never cross a `/`,
/// - `**` matches any number of directories,
/// - a pattern ending in `/` is shorthand for `<pattern>**`.
#[derive(Clone)]
pub struct AntPatternSet {
    includes: Vec<String>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
    recursive: bool,
}

impl fmt::Debug for AntPatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AntPatternSet")
            .field("includes", &self.includes)
            .field("recursive", &self.recursive)
            .finish_non_exhaustive()
    }
}

impl AntPatternSet {
    /// Compile from comma separated pattern lists.
    pub fn from_specs(includes: &str, excludes: Option<&str>) -> Result<Self> {
        let includes = split_patterns(includes);
        let excludes = excludes.map(split_patterns).unwrap_or_default();
        Self::new(includes, &excludes)
    }

    pub fn new(includes: Vec<String>, excludes: &[String]) -> Result<Self> {
        if includes.is_empty() {
            return Err(FsTriggerError::Pattern(
                "at least one include pattern is required".to_string(),
            ));
        }

        let include_set = build_globset(&includes)
            .with_context(|| format!("building include globset for {:?}", includes))?;

        let exclude_set = if excludes.is_empty() {
            None
        } else {
            Some(
                build_globset(excludes)
                    .with_context(|| format!("building exclude globset for {:?}", excludes))?,
            )
        };

        let recursive = includes.iter().any(|p| p.contains('/') || p.contains("**"));

        Ok(Self {
            includes,
            include_set,
            exclude_set,
            recursive,
        })
    }

    /// Whether matching can require descending below the top directory.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Returns true if `rel_path` (relative, `/` separated) is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Split an Ant pattern list on commas. Spaces inside a pattern are kept.
pub fn split_patterns(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let p = p.replace('\\', "/");
            if p.ends_with('/') { format!("{p}**") } else { p }
        })
        .collect()
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// A path selected by [`collect_matching`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPath {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Collect everything under `root` selected by `patterns`, sorted by path.
///
/// Directories are only reported when `include_dirs` is set; they are
/// descended into when the pattern set is recursive, at most once per
/// canonical directory so symlink cycles terminate.
pub fn collect_matching(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &AntPatternSet,
    include_dirs: bool,
) -> Result<Vec<MatchedPath>> {
    let mut matched = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(fs.canonicalize(root)?);
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            let is_dir = fs.is_dir(&path);
            if is_dir && patterns.is_recursive() {
                // Unresolvable directories are reported but not walked.
                if let Ok(canonical) = fs.canonicalize(&path) {
                    if visited.insert(canonical) {
                        stack.push(path.clone());
                    }
                }
            }
            if is_dir && !include_dirs {
                continue;
            }
            if !is_dir && !fs.is_file(&path) {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(root) {
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if patterns.matches(&rel_str) {
                    matched.push(MatchedPath { path, is_dir });
                }
            }
        }
    }

    matched.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn single_star_stays_in_one_directory() {
        let set = AntPatternSet::from_specs("*.log", None).unwrap();
        assert!(set.matches("a.log"));
        assert!(!set.matches("sub/a.log"));
        assert!(!set.is_recursive());
    }

    #[test]
    fn double_star_crosses_directories_and_excludes_apply() {
        let set = AntPatternSet::from_specs("**/*.rs, src/", Some("target/**")).unwrap();
        assert!(set.matches("main.rs"));
        assert!(set.matches("a/b/c.rs"));
        assert!(set.matches("src/README"));
        assert!(!set.matches("target/debug/build.rs"));
    }

    #[test]
    fn collects_sorted_files_only_by_default() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/b.txt", "b");
        fs.add_file("/w/a.txt", "a");
        fs.add_file("/w/sub/c.txt", "c");

        let set = AntPatternSet::from_specs(DEFAULT_INCLUDES, None).unwrap();
        let found = collect_matching(&fs, Path::new("/w"), &set, false).unwrap();
        let paths: Vec<_> = found.iter().map(|m| m.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/w/a.txt"),
                PathBuf::from("/w/b.txt"),
                PathBuf::from("/w/sub/c.txt"),
            ]
        );

        let with_dirs = AntPatternSet::from_specs("**", None).unwrap();
        let found = collect_matching(&fs, Path::new("/w"), &with_dirs, true).unwrap();
        assert!(found.iter().any(|m| m.is_dir && m.path == Path::new("/w/sub")));
    }

    #[test]
    fn spaces_stay_inside_a_pattern() {
        assert_eq!(
            split_patterns("build output.log, logs/ "),
            vec!["build output.log".to_string(), "logs/**".to_string()]
        );
        let set = AntPatternSet::from_specs("build output.log", None).unwrap();
        assert!(set.matches("build output.log"));
        assert!(!set.matches("build"));
        assert!(!set.matches("output.log"));
    }

    #[cfg(unix)]
    #[test]
    fn self_referencing_symlink_is_walked_once() {
        use crate::fs::RealFileSystem;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(".", dir.path().join("loop")).unwrap();

        let set = AntPatternSet::from_specs(DEFAULT_INCLUDES, None).unwrap();
        let found = collect_matching(&RealFileSystem, dir.path(), &set, false).unwrap();
        let paths: Vec<_> = found.into_iter().map(|m| m.path).collect();
        assert_eq!(paths, vec![dir.path().join("a.txt")]);

        let everything = AntPatternSet::from_specs("**", None).unwrap();
        let found = collect_matching(&RealFileSystem, dir.path(), &everything, true).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|m| m.is_dir && m.path == dir.path().join("loop")));
    }
}
