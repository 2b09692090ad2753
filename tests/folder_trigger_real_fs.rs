// tests/folder_trigger_real_fs.rs

mod common;
use crate::common::builders::FolderSpecBuilder;
use crate::common::init_tracing;

use std::fs;
use std::sync::Arc;

use fstrigger::detect::{FolderTrigger, SkipCheck, Trigger};
use fstrigger::host::{Host, HostDirectory, LocalHost, StaticHosts};
use fstrigger::poll_log::PollLog;
use fstrigger::select::TargetSelector;
use tempfile::tempdir;

fn selector() -> TargetSelector {
    let local: Arc<dyn Host> = Arc::new(LocalHost::new("local"));
    let hosts: Arc<dyn HostDirectory> = Arc::new(StaticHosts::new(local));
    TargetSelector::new(hosts, None)
}

#[test]
fn removed_file_is_a_change() {
    init_tracing();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();

    let spec = FolderSpecBuilder::new(&dir.path().display().to_string()).build();
    let mut trigger = FolderTrigger::new("dir", spec, selector()).unwrap();
    let mut log = PollLog::new();
    trigger.start(&mut log).unwrap();

    let verdict = trigger.check();
    assert!(!verdict.changed, "log: {:?}", verdict.log.lines());

    fs::remove_file(dir.path().join("b.txt")).unwrap();
    let verdict = trigger.check();
    assert!(verdict.changed);
    assert!(verdict.log.contains("content has changed"));
}

#[test]
fn added_file_is_a_change_even_without_count_check() {
    init_tracing();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();

    let spec = FolderSpecBuilder::new(&dir.path().display().to_string())
        .skip(SkipCheck::Count)
        .build();
    let mut trigger = FolderTrigger::new("dir", spec, selector()).unwrap();
    let mut log = PollLog::new();
    trigger.start(&mut log).unwrap();

    fs::write(dir.path().join("c.txt"), "c").unwrap();
    let verdict = trigger.check();
    assert!(verdict.changed);
    assert!(verdict.log.contains("is new"));
}

#[test]
fn content_rewrite_is_caught_by_fingerprint() {
    init_tracing();
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/lib.rs"), "pub fn a() {}").unwrap();
    fs::write(dir.path().join("notes.md"), "ignored").unwrap();

    let spec = FolderSpecBuilder::new(&dir.path().display().to_string())
        .includes("**/*.rs")
        .skip(SkipCheck::ModificationDate)
        .build();
    let mut trigger = FolderTrigger::new("dir", spec, selector()).unwrap();
    let mut log = PollLog::new();
    trigger.start(&mut log).unwrap();
    assert_eq!(trigger.detector().inventory().map(|i| i.len()), Some(1));

    fs::write(dir.path().join("notes.md"), "still ignored").unwrap();
    assert!(!trigger.check().changed);

    fs::write(dir.path().join("src/lib.rs"), "pub fn b() {}").unwrap();
    let verdict = trigger.check();
    assert!(verdict.changed);
    assert!(verdict.log.contains("The contents of"));
}

#[test]
fn deleted_folder_then_recreated() {
    init_tracing();
    let root = tempdir().unwrap();
    let watched = root.path().join("watched");
    fs::create_dir(&watched).unwrap();
    fs::write(watched.join("a.txt"), "a").unwrap();

    let spec = FolderSpecBuilder::new(&watched.display().to_string()).build();
    let mut trigger = FolderTrigger::new("dir", spec, selector()).unwrap();
    let mut log = PollLog::new();
    trigger.start(&mut log).unwrap();

    fs::remove_dir_all(&watched).unwrap();
    let verdict = trigger.check();
    assert!(!verdict.changed);
    assert!(verdict.log.contains("doesn't exist"));

    fs::create_dir(&watched).unwrap();
    fs::write(watched.join("a.txt"), "a").unwrap();
    assert!(trigger.check().changed);
}
