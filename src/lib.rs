// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod store;
pub mod trigger;
pub mod types;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_from_path};
use crate::engine::Scheduler;
use crate::exec::CommandJob;
use crate::trigger::CronTrigger;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (with the `--timeout` override)
/// - scheduler + cron trigger
/// - one `CommandJob` per `[job.<name>]`
/// - Ctrl-C / SIGTERM handling and bounded shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_path();
    let cfg = load_config(config_path, args.timeout.as_deref())
        .with_context(|| format!("loading {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let scheduler = Scheduler::new(cfg.scheduler, CronTrigger::new());
    for (name, job) in cfg.jobs.iter() {
        scheduler.submit_with_timeout(
            &job.schedule,
            name,
            job.timeout,
            CommandJob::new(name.clone(), job.cmd.clone()),
        )?;
    }
    scheduler.start();

    wait_for_signal().await;

    let budget = scheduler.config().shutdown_timeout;
    info!(?budget, "shutdown requested");
    scheduler.shutdown(budget).await?;
    info!("all executions finished; exiting");
    Ok(())
}

/// Read the TOML file, apply the CLI timeout override, then validate.
fn load_config(path: &Path, timeout_override: Option<&str>) -> Result<ConfigFile> {
    let mut raw = load_from_path(path)?;
    if let Some(timeout) = timeout_override {
        debug!(%timeout, "overriding [config].timeout from the command line");
        raw.config.timeout = timeout.to_string();
    }
    Ok(ConfigFile::try_from(raw)?)
}

/// Resolve on the first of Ctrl-C or (on unix) SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Simple dry-run output: print global options and every job.
fn print_dry_run(cfg: &ConfigFile) {
    println!("gracecron dry-run");
    println!("  config.timeout = {:?}", cfg.scheduler.timeout);
    println!("  config.shutdown_timeout = {:?}", cfg.scheduler.shutdown_timeout);
    println!("  config.overlap = {:?}", cfg.scheduler.overlap);
    println!();

    println!("jobs ({}):", cfg.jobs.len());
    for (name, job) in cfg.jobs.iter() {
        println!("  - {name}");
        println!("      schedule: {}", job.schedule);
        println!("      cmd: {}", job.cmd);
        if job.timeout != cfg.scheduler.timeout {
            println!("      timeout: {:?}", job.timeout);
        }
    }

    debug!("dry-run complete (nothing scheduled)");
}
