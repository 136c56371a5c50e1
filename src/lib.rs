// src/lib.rs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod reload;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, TaskCommand};
use crate::config::{load_or_default, ConfigFile};
use crate::dispatch::WatchSet;
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::fs::{FileSystem, RealFileSystem};
use crate::reload::{start_dev_server, NoopNotifier, ReloadHub, ReloadNotifier};
use crate::tasks::{Pipeline, PipelineBackend};
use crate::types::{Category, PathKey};
use crate::watch::{spawn_watcher, ChangeFilter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - pipeline / core / runtime
/// - (optional) dev server and file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = Arc::new(load_or_default(&config_path)?);
    let task = args.task();

    if args.dry_run {
        print_dry_run(task, &cfg);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    let root = root.canonicalize().unwrap_or(root);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    // Reload listeners only exist while serving.
    let hub = ReloadHub::default();
    let notifier: Arc<dyn ReloadNotifier> = if task.serves() {
        Arc::new(hub.clone())
    } else {
        Arc::new(NoopNotifier)
    };

    let _server = if task.serves() {
        let base_dir = root.join(&cfg.server().base_dir);
        Some(start_dev_server(cfg.server(), base_dir, hub)?)
    } else {
        None
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher = if task.watches() {
        let watch_set = WatchSet::from_paths(cfg.paths())?;
        info!(patterns = ?watch_set.patterns(), "watching source patterns");
        let filter = ChangeFilter::new(&root, watch_set, cfg.skip_unchanged());
        Some(spawn_watcher(&root, filter, Arc::clone(&fs), rt_tx.clone())?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let initial = task.initial_categories();
    info!(?task, categories = ?initial, "initial tasks to trigger at startup");
    for category in &initial {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                category: *category,
                reason: TriggerReason::Manual,
            })
            .await?;
    }

    // A one-shot task with nothing to run would otherwise wait forever.
    if task.exits_when_idle() && initial.is_empty() {
        return Ok(());
    }

    let options = RuntimeOptions {
        exit_when_idle: task.exits_when_idle(),
    };
    let pipeline = Arc::new(Pipeline::new(Arc::clone(&cfg), &root, fs, notifier));
    let backend = PipelineBackend::new(pipeline, rt_tx);
    let core = CoreRuntime::new(cfg.behaviour(), options);

    let report = Runtime::new(core, rt_rx, backend).run().await?;
    check_report(task, &report)
}

/// One-shot tasks fail when any run failed; watch mode only logs.
fn check_report(task: TaskCommand, report: &RunReport) -> Result<()> {
    if task.exits_when_idle() && report.has_failures() {
        let failed: Vec<&str> = report
            .failed_categories()
            .into_iter()
            .map(Category::task_name)
            .collect();
        return Err(anyhow!(
            "{} of {} task run(s) failed: {}",
            report.total_failures(),
            report.total_runs(),
            failed.join(", ")
        ));
    }
    Ok(())
}

/// Project root: the directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print the resolved task, path mapping and transforms.
fn print_dry_run(task: TaskCommand, cfg: &ConfigFile) {
    println!("assetpipe dry-run");
    println!("  task = {:?}", task);
    println!(
        "  categories = {:?}",
        task.initial_categories()
            .iter()
            .map(|c| c.task_name())
            .collect::<Vec<_>>()
    );
    println!("  serve = {}, watch = {}", task.serves(), task.watches());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.behaviour()
    );
    println!("  config.skip_unchanged = {}", cfg.skip_unchanged());
    println!();

    println!("paths:");
    for key in PathKey::ALL {
        let entry = cfg.paths().entry(key);
        println!("  - {}", key.key());
        println!("      src:   {}", entry.src);
        if key.is_watched() && entry.watch != entry.src {
            println!("      watch: {}", entry.watch);
        }
        println!("      dest:  {}", entry.dest);
    }
    println!();

    println!("transforms:");
    for category in Category::ALL {
        match cfg.transform(category) {
            Some(t) => println!("  - {}: [{:?}] {}", category, t.mode, t.cmd),
            None => println!("  - {}: built-in", category),
        }
    }

    if task.serves() {
        let server = cfg.server();
        println!();
        println!(
            "server: http://{}:{} serving {} (reload port {})",
            server.host, server.port, server.base_dir, server.reload_port
        );
    }

    debug!("dry-run complete (no execution)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskOutcome;

    #[test]
    fn root_is_config_directory() {
        assert_eq!(config_root_dir(Path::new("Assetpipe.toml")), PathBuf::from("."));
        assert_eq!(
            config_root_dir(Path::new("site/Assetpipe.toml")),
            PathBuf::from("site")
        );
    }

    #[test]
    fn one_shot_failures_become_an_error() {
        let mut report = RunReport::default();
        report.record(Category::Style, TaskOutcome::Failed);
        report.record(Category::Script, TaskOutcome::Success);

        let err = check_report(TaskCommand::Minify, &report).unwrap_err();
        assert!(err.to_string().contains("minifysass"));
        assert!(check_report(TaskCommand::Watch, &report).is_ok());
    }
}
