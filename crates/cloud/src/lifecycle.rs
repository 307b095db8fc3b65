//! Snapshot lifecycle manager.
//!
//! [`SnapshotLifecycleManager`] keeps a local, re-encrypted copy of the
//! newest shared snapshot for a source database and restores dependent
//! instances from it. It holds no state between calls: every decision is
//! re-derived from what the registries report, and cross-process races are
//! absorbed by treating "already exists" and "not found on delete" as
//! success.

use std::sync::Arc;

use snapvault_core::instance::{
    DependentInstance, Endpoint, InstanceConfig, RestoreRequest,
};
use snapvault_core::retention::expired_copies;
use snapvault_core::settings::LifecycleSettings;
use snapvault_core::snapshot::{
    copy_identifier, needs_refresh, newest_available_shared, newest_local, superseded_copies,
    validate_instance_identifier, LocalSnapshotCopy, SharedSnapshot,
};

use crate::clock::{Clock, SystemClock};
use crate::error::LifecycleError;
use crate::progress::{LogProgress, ProgressSink};
use crate::registry::{CreateOutcome, DeleteOutcome, InstanceRegistry, SnapshotRegistry};

pub struct SnapshotLifecycleManager {
    pub(crate) snapshots: Arc<dyn SnapshotRegistry>,
    pub(crate) instances: Arc<dyn InstanceRegistry>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    settings: LifecycleSettings,
}

impl SnapshotLifecycleManager {
    /// Create a manager using the wall clock and log-based progress.
    pub fn new(
        snapshots: Arc<dyn SnapshotRegistry>,
        instances: Arc<dyn InstanceRegistry>,
        settings: LifecycleSettings,
    ) -> Result<Self, LifecycleError> {
        settings.validate()?;
        Ok(Self {
            snapshots,
            instances,
            clock: Arc::new(SystemClock),
            progress: Arc::new(LogProgress),
            settings,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Shared snapshot
    // -----------------------------------------------------------------------

    /// Newest `available` shared snapshot taken from `owning_id`.
    pub async fn resolve_current_shared(
        &self,
        owning_id: &str,
    ) -> Result<SharedSnapshot, LifecycleError> {
        tracing::info!(owning_id, "Resolving newest shared snapshot");

        let shared = self.snapshots.list_shared().await?;
        let newest = newest_available_shared(&shared, owning_id)
            .cloned()
            .ok_or_else(|| LifecycleError::NoSharedSnapshot {
                owning_id: owning_id.to_string(),
            })?;

        tracing::info!(
            owning_id,
            snapshot = %newest.identifier,
            created_at = %newest.created_at,
            "Resolved shared snapshot",
        );
        Ok(newest)
    }

    // -----------------------------------------------------------------------
    // Local copy
    // -----------------------------------------------------------------------

    /// Return a local copy at least as new as `shared`, copying only when the
    /// newest local copy is missing or strictly older.
    pub async fn ensure_local_copy(
        &self,
        shared: &SharedSnapshot,
        owning_id: &str,
    ) -> Result<LocalSnapshotCopy, LifecycleError> {
        let copies = self.snapshots.list_local(owning_id).await?;
        let current = newest_local(&copies);

        if !needs_refresh(shared, current) {
            if let Some(copy) = current {
                tracing::info!(
                    owning_id,
                    snapshot = %copy.identifier,
                    "Local snapshot copy is current -- reusing it",
                );
                return Ok(copy.clone());
            }
        }

        tracing::info!(
            owning_id,
            shared_created_at = %shared.created_at,
            local_created_at = ?current.and_then(|c| c.created_at),
            "Local snapshot copy missing or stale -- creating a new copy",
        );

        let kms_key_id = self.settings.require_kms_key()?;
        let target_id = copy_identifier(shared)?;

        self.prune_old_copies(owning_id).await?;

        let copy = match self
            .snapshots
            .copy_snapshot(shared, &target_id, kms_key_id)
            .await?
        {
            CreateOutcome::Created(copy) => {
                tracing::info!(
                    owning_id,
                    source = %shared.arn,
                    snapshot = %copy.identifier,
                    "Snapshot copy started",
                );
                copy
            }
            CreateOutcome::AlreadyExists(copy) => {
                tracing::info!(
                    owning_id,
                    snapshot = %copy.identifier,
                    status = %copy.status,
                    "Snapshot local copy already exists -- reusing it",
                );
                copy
            }
        };

        let copy = if copy.status.is_available() && copy.created_at.is_some() {
            copy
        } else {
            self.wait_for_snapshot(&copy.identifier).await?
        };

        if self.settings.prune_superseded {
            self.prune_superseded(owning_id, shared, &copy.identifier)
                .await?;
        }

        Ok(copy)
    }

    /// Delete local copies past the configured retention window.
    ///
    /// Returns the identifiers that were deleted.
    pub async fn prune_old_copies(&self, owning_id: &str) -> Result<Vec<String>, LifecycleError> {
        self.prune_copies_older_than(owning_id, self.settings.retention)
            .await
    }

    /// Delete local copies older than `retention`. Copies still being created
    /// have no timestamp and are left for a later pass.
    pub async fn prune_copies_older_than(
        &self,
        owning_id: &str,
        retention: chrono::Duration,
    ) -> Result<Vec<String>, LifecycleError> {
        let copies = self.snapshots.list_local(owning_id).await?;
        let now = self.clock.now();
        let expired = expired_copies(&copies, now, retention);

        tracing::info!(
            owning_id,
            candidates = copies.len(),
            expired = expired.len(),
            retention_days = retention.num_days(),
            "Pruning old snapshot copies",
        );

        let ids: Vec<&str> = expired.iter().map(|c| c.identifier.as_str()).collect();
        self.delete_copies(&ids, "expired").await
    }

    /// Delete copies of `owning_id` that predate `shared`, except `keep`.
    pub async fn prune_superseded(
        &self,
        owning_id: &str,
        shared: &SharedSnapshot,
        keep: &str,
    ) -> Result<Vec<String>, LifecycleError> {
        let copies = self.snapshots.list_local(owning_id).await?;
        let ids: Vec<&str> = superseded_copies(&copies, shared, keep)
            .into_iter()
            .map(|c| c.identifier.as_str())
            .collect();
        self.delete_copies(&ids, "superseded").await
    }

    async fn delete_copies(
        &self,
        ids: &[&str],
        reason: &'static str,
    ) -> Result<Vec<String>, LifecycleError> {
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            match self.snapshots.delete_snapshot(id).await? {
                DeleteOutcome::Deleted => {
                    tracing::info!(snapshot = %id, reason, "Deleted snapshot copy");
                    deleted.push(id.to_string());
                }
                DeleteOutcome::NotFound => {
                    tracing::info!(snapshot = %id, reason, "Snapshot copy already gone");
                }
            }
        }
        Ok(deleted)
    }

    /// Resolve the current shared snapshot and make sure a local copy of it
    /// exists.
    pub async fn refresh_local_copy(
        &self,
        owning_id: &str,
    ) -> Result<LocalSnapshotCopy, LifecycleError> {
        let shared = self.resolve_current_shared(owning_id).await?;
        self.ensure_local_copy(&shared, owning_id).await
    }

    // -----------------------------------------------------------------------
    // Dependent instance
    // -----------------------------------------------------------------------

    /// Restore `target_id` from `copy`, inheriting placement from
    /// `reference_id`. An existing target is reused as-is and never waited
    /// on; one without an endpoint yet is a [`LifecycleError::MissingEndpoint`].
    pub async fn provision_dependent(
        &self,
        target_id: &str,
        copy: &LocalSnapshotCopy,
        reference_id: &str,
    ) -> Result<Endpoint, LifecycleError> {
        validate_instance_identifier(target_id)?;
        tracing::info!(
            target_id,
            snapshot = %copy.identifier,
            reference_id,
            "Restoring RDS instance from snapshot copy",
        );

        if let Some(existing) = self.instances.describe_instance(target_id).await? {
            tracing::info!(target_id, status = %existing.status, "RDS instance already exists -- using it");
            return endpoint_of(existing);
        }

        let config = self.reference_config(reference_id).await?;
        let request = RestoreRequest {
            target_id: target_id.to_string(),
            snapshot_id: copy.identifier.clone(),
            config,
        };

        match self.instances.restore_from_snapshot(&request).await? {
            CreateOutcome::AlreadyExists(existing) => {
                tracing::info!(target_id, status = %existing.status, "RDS instance already exists -- using it");
                return endpoint_of(existing);
            }
            CreateOutcome::Created(_) => {
                tracing::info!(
                    target_id,
                    subnet_group = %request.config.subnet_group,
                    instance_class = %request.config.instance_class,
                    "Restore started",
                );
            }
        }

        let ready = self.wait_for_instance(target_id).await?;
        endpoint_of(ready)
    }

    /// Full flow: newest shared snapshot -> fresh local copy -> instance.
    pub async fn restore_from_shared(
        &self,
        owning_id: &str,
        target_id: &str,
        reference_id: &str,
    ) -> Result<Endpoint, LifecycleError> {
        let shared = self.resolve_current_shared(owning_id).await?;
        let copy = self.ensure_local_copy(&shared, owning_id).await?;
        self.provision_dependent(target_id, &copy, reference_id)
            .await
    }

    /// Delete `target_id` without a final snapshot. A missing instance is
    /// not an error.
    pub async fn destroy(&self, target_id: &str) -> Result<DeleteOutcome, LifecycleError> {
        tracing::info!(target_id, "Destroying RDS instance");

        let outcome = self.instances.delete_instance(target_id).await?;
        match outcome {
            DeleteOutcome::Deleted => {
                tracing::info!(target_id, "RDS instance deletion requested");
            }
            DeleteOutcome::NotFound => {
                tracing::info!(target_id, "RDS instance not found -- nothing to delete");
            }
        }
        Ok(outcome)
    }

    async fn reference_config(&self, reference_id: &str) -> Result<InstanceConfig, LifecycleError> {
        let reference = self
            .instances
            .describe_instance(reference_id)
            .await?
            .ok_or_else(|| LifecycleError::ReferenceNotFound {
                identifier: reference_id.to_string(),
            })?;

        let incomplete = |field| LifecycleError::ReferenceIncomplete {
            identifier: reference_id.to_string(),
            field,
        };

        Ok(InstanceConfig {
            subnet_group: reference
                .subnet_group
                .ok_or_else(|| incomplete("subnet group"))?,
            instance_class: reference
                .instance_class
                .ok_or_else(|| incomplete("instance class"))?,
        })
    }
}

fn endpoint_of(instance: DependentInstance) -> Result<Endpoint, LifecycleError> {
    instance
        .endpoint
        .ok_or_else(|| LifecycleError::MissingEndpoint {
            identifier: instance.identifier,
            status: instance.status.to_string(),
        })
}
