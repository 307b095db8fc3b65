//! Subcommand dispatch and result rendering.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use snapvault_cloud::{DeleteOutcome, RdsRegistry, SnapshotLifecycleManager};
use snapvault_core::instance::Endpoint;
use snapvault_core::snapshot::LocalSnapshotCopy;

use crate::cli::{Cli, Command};
use crate::progress::BarProgress;

#[derive(Debug, Serialize)]
struct RestoreReport {
    target: String,
    endpoint: Endpoint,
}

#[derive(Debug, Serialize)]
struct RefreshReport {
    source: String,
    copy: LocalSnapshotCopy,
}

#[derive(Debug, Serialize)]
struct PruneReport {
    source: String,
    deleted: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DestroyReport {
    target: String,
    outcome: DeleteOutcome,
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = cli
        .lifecycle
        .to_settings()
        .context("Invalid lifecycle settings")?;

    let registry =
        Arc::new(RdsRegistry::from_env(cli.profile.as_deref(), cli.region.as_deref()).await);
    let mut manager = SnapshotLifecycleManager::new(registry.clone(), registry, settings)?;
    if !cli.no_progress && !cli.json {
        manager = manager.with_progress(Arc::new(BarProgress::default()));
    }

    match cli.command {
        Command::Restore {
            source,
            target,
            config_from,
        } => {
            let endpoint = manager
                .restore_from_shared(&source, &target, &config_from)
                .await
                .with_context(|| format!("Failed to restore '{target}' from '{source}'"))?;
            let text = format!("{target} is available at {endpoint}");
            emit(cli.json, &RestoreReport { target, endpoint }, text)
        }
        Command::Refresh { source } => {
            let copy = manager
                .refresh_local_copy(&source)
                .await
                .with_context(|| format!("Failed to refresh the local copy for '{source}'"))?;
            let text = format!("Local copy for {source}: {} ({})", copy.identifier, copy.status);
            emit(cli.json, &RefreshReport { source, copy }, text)
        }
        Command::Prune { source } => {
            let deleted = manager
                .prune_old_copies(&source)
                .await
                .with_context(|| format!("Failed to prune copies for '{source}'"))?;
            let text = if deleted.is_empty() {
                format!("No expired copies for {source}")
            } else {
                format!("Deleted {} copies for {source}: {}", deleted.len(), deleted.join(", "))
            };
            emit(cli.json, &PruneReport { source, deleted }, text)
        }
        Command::Destroy { target } => {
            let outcome = manager
                .destroy(&target)
                .await
                .with_context(|| format!("Failed to destroy '{target}'"))?;
            let text = match outcome {
                DeleteOutcome::Deleted => format!("Deletion of {target} requested"),
                DeleteOutcome::NotFound => format!("{target} does not exist"),
            };
            emit(cli.json, &DestroyReport { target, outcome }, text)
        }
    }
}

fn emit<T: Serialize>(json: bool, report: &T, text: String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
