// src/lib.rs

pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod host;
pub mod inspect;
pub mod logging;
pub mod poll_log;
pub mod resolve;
pub mod select;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::detect::{FileTrigger, FolderTrigger};
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions, ScheduledTrigger};
use crate::host::{Host, HostDirectory, LocalHost, StaticHosts};
use crate::inspect::InspectorRegistry;
use crate::select::TargetSelector;

/// Id of the host the engine itself runs on.
pub const LOCAL_HOST_ID: &str = "local";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - hosts and triggers
/// - runtime with its poll queues and tickers
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let registry = InspectorRegistry::with_builtins();
    let hosts = hosts_from_config(&cfg);
    let triggers = triggers_from_config(&cfg, hosts, &registry)?;
    info!(triggers = triggers.len(), once = args.once, "triggers built");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };
    let runtime = Runtime::new(triggers, options, rt_rx, rt_tx);
    let summary = runtime.run().await?;
    debug!(fired = summary.fired.len(), "run finished");
    Ok(())
}

/// Hosts declared in `[[host]]`, running in-process on the real filesystem.
///
/// The host with id [`LOCAL_HOST_ID`] (created when not declared) serves
/// triggers without a label.
pub fn hosts_from_config(cfg: &ConfigFile) -> Arc<dyn HostDirectory> {
    let local_labels = cfg
        .hosts()
        .iter()
        .find(|h| h.id == LOCAL_HOST_ID)
        .map(|h| h.labels.clone())
        .unwrap_or_default();
    let local: Arc<dyn Host> = Arc::new(LocalHost::new(LOCAL_HOST_ID).with_labels(local_labels));

    let mut directory = StaticHosts::new(Arc::clone(&local));
    for host in cfg.hosts() {
        let host: Arc<dyn Host> = if host.id == LOCAL_HOST_ID {
            Arc::clone(&local)
        } else {
            Arc::new(LocalHost::new(host.id.clone()).with_labels(host.labels.clone()))
        };
        directory = directory.with_host(host);
    }
    Arc::new(directory)
}

/// Build every configured trigger, file triggers first.
pub fn triggers_from_config(
    cfg: &ConfigFile,
    hosts: Arc<dyn HostDirectory>,
    registry: &InspectorRegistry,
) -> errors::Result<Vec<ScheduledTrigger>> {
    let selector_for = |label: &Option<String>| {
        TargetSelector::new(Arc::clone(&hosts), label.clone()).with_vars(cfg.vars().clone())
    };

    let mut triggers = Vec::with_capacity(cfg.trigger_count());
    for file in cfg.files() {
        let trigger = FileTrigger::new(
            file.name.clone(),
            file.entries.clone(),
            selector_for(&file.label),
            registry,
        )?;
        triggers.push(ScheduledTrigger::new(Box::new(trigger), file.interval));
    }
    for folder in cfg.folders() {
        let trigger = FolderTrigger::new(
            folder.name.clone(),
            folder.spec.clone(),
            selector_for(&folder.label),
        )?;
        triggers.push(ScheduledTrigger::new(Box::new(trigger), folder.interval));
    }
    Ok(triggers)
}

/// Simple dry-run output: print triggers, patterns and inspectors.
fn print_dry_run(cfg: &ConfigFile) {
    println!("fstrigger dry-run");
    if !cfg.vars().is_empty() {
        println!("  config.vars = {:?}", cfg.vars());
    }
    println!();

    println!("file triggers ({}):", cfg.files().len());
    for file in cfg.files() {
        println!("  - {} (every {:?})", file.name, file.interval);
        if let Some(ref label) = file.label {
            println!("      label: {label}");
        }
        for entry in &file.entries {
            println!("      pattern: {} [{}]", entry.pattern, entry.strategy);
            if entry.skip_modification_date {
                println!("        skip_modification_date: true");
            }
            for inspector in &entry.inspectors {
                println!("        inspector: {}", inspector.kind);
            }
        }
    }

    println!("folder triggers ({}):", cfg.folders().len());
    for folder in cfg.folders() {
        println!("  - {} (every {:?})", folder.name, folder.interval);
        if let Some(ref label) = folder.label {
            println!("      label: {label}");
        }
        println!("      path: {}", folder.spec.path);
        if let Some(ref includes) = folder.spec.includes {
            println!("      includes: {includes}");
        }
        if let Some(ref excludes) = folder.spec.excludes {
            println!("      excludes: {excludes}");
        }
        if folder.spec.track_directories {
            println!("      track_directories: true");
        }
        if !folder.spec.skip.is_empty() {
            println!("      skip: {:?}", folder.spec.skip);
        }
    }

    if !cfg.hosts().is_empty() {
        println!("hosts ({}):", cfg.hosts().len());
        for host in cfg.hosts() {
            println!("  - {} {:?}", host.id, host.labels);
        }
    }

    debug!("dry-run complete (no polling)");
}
