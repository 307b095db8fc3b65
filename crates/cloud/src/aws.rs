//! AWS RDS implementation of the registry traits.
//!
//! Maps RDS faults onto the tagged outcomes the manager expects:
//! `DBSnapshotAlreadyExists` / `DBInstanceAlreadyExists` become
//! [`CreateOutcome::AlreadyExists`], `DBSnapshotNotFound` /
//! `DBInstanceNotFound` become `None` or [`DeleteOutcome::NotFound`].
//! Everything else is a [`RegistryError::Sdk`].

use async_trait::async_trait;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::types::{DbInstance, DbSnapshot};
use aws_sdk_rds::Client;
use chrono::{DateTime, Utc};
use snapvault_core::instance::{DependentInstance, Endpoint, InstanceStatus, RestoreRequest};
use snapvault_core::snapshot::{LocalSnapshotCopy, SharedSnapshot, SnapshotStatus};

use crate::error::RegistryError;
use crate::registry::{CreateOutcome, DeleteOutcome, InstanceRegistry, SnapshotRegistry};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const SNAPSHOT_TYPE_SHARED: &str = "shared";
const SNAPSHOT_TYPE_MANUAL: &str = "manual";

// ---------------------------------------------------------------------------
// RdsRegistry
// ---------------------------------------------------------------------------

/// Snapshot and instance registry backed by the RDS API.
#[derive(Debug, Clone)]
pub struct RdsRegistry {
    client: Client,
}

impl RdsRegistry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain, optionally pinned
    /// to a named profile and region.
    pub async fn from_env(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;
        tracing::debug!(region = ?config.region(), "AWS configuration loaded");
        Self::new(Client::new(&config))
    }

    async fn list_snapshots(
        &self,
        owning_id: Option<&str>,
        snapshot_type: &'static str,
    ) -> Result<Vec<DbSnapshot>, RegistryError> {
        let mut request = self
            .client
            .describe_db_snapshots()
            .snapshot_type(snapshot_type);
        if snapshot_type == SNAPSHOT_TYPE_SHARED {
            request = request.include_shared(true);
        }
        if let Some(owning_id) = owning_id {
            request = request.db_instance_identifier(owning_id);
        }

        let mut pages = request.into_paginator().send();
        let mut snapshots = Vec::new();
        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => snapshots.extend(page.db_snapshots().iter().cloned()),
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_db_snapshot_not_found_fault()) =>
                {
                    break;
                }
                Err(err) => return Err(sdk_error("DescribeDBSnapshots", err)),
            }
        }
        Ok(snapshots)
    }
}

#[async_trait]
impl SnapshotRegistry for RdsRegistry {
    async fn list_shared(&self) -> Result<Vec<SharedSnapshot>, RegistryError> {
        let snapshots = self.list_snapshots(None, SNAPSHOT_TYPE_SHARED).await?;
        Ok(snapshots.iter().filter_map(to_shared).collect())
    }

    async fn list_local(&self, owning_id: &str) -> Result<Vec<LocalSnapshotCopy>, RegistryError> {
        let snapshots = self
            .list_snapshots(Some(owning_id), SNAPSHOT_TYPE_MANUAL)
            .await?;
        snapshots.iter().map(to_local).collect()
    }

    async fn describe_snapshot(
        &self,
        identifier: &str,
    ) -> Result<Option<LocalSnapshotCopy>, RegistryError> {
        let result = self
            .client
            .describe_db_snapshots()
            .db_snapshot_identifier(identifier)
            .send()
            .await;

        match result {
            Ok(out) => out.db_snapshots().first().map(to_local).transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_snapshot_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error("DescribeDBSnapshots", err)),
        }
    }

    async fn copy_snapshot(
        &self,
        source: &SharedSnapshot,
        target_id: &str,
        kms_key_id: &str,
    ) -> Result<CreateOutcome<LocalSnapshotCopy>, RegistryError> {
        let result = self
            .client
            .copy_db_snapshot()
            .source_db_snapshot_identifier(&source.arn)
            .target_db_snapshot_identifier(target_id)
            .kms_key_id(kms_key_id)
            .send()
            .await;

        match result {
            Ok(out) => {
                let snapshot = out.db_snapshot().ok_or_else(|| RegistryError::Malformed {
                    operation: "CopyDBSnapshot",
                    detail: "missing DBSnapshot".into(),
                })?;
                Ok(CreateOutcome::Created(to_local(snapshot)?))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_snapshot_already_exists_fault()) =>
            {
                let existing = self.describe_snapshot(target_id).await?.ok_or_else(|| {
                    RegistryError::Malformed {
                        operation: "CopyDBSnapshot",
                        detail: format!("'{target_id}' reported as existing but not found"),
                    }
                })?;
                Ok(CreateOutcome::AlreadyExists(existing))
            }
            Err(err) => Err(sdk_error("CopyDBSnapshot", err)),
        }
    }

    async fn delete_snapshot(&self, identifier: &str) -> Result<DeleteOutcome, RegistryError> {
        let result = self
            .client
            .delete_db_snapshot()
            .db_snapshot_identifier(identifier)
            .send()
            .await;

        match result {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_snapshot_not_found_fault()) =>
            {
                Ok(DeleteOutcome::NotFound)
            }
            Err(err) => Err(sdk_error("DeleteDBSnapshot", err)),
        }
    }
}

#[async_trait]
impl InstanceRegistry for RdsRegistry {
    async fn describe_instance(
        &self,
        identifier: &str,
    ) -> Result<Option<DependentInstance>, RegistryError> {
        let result = self
            .client
            .describe_db_instances()
            .db_instance_identifier(identifier)
            .send()
            .await;

        match result {
            Ok(out) => out.db_instances().first().map(to_instance).transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_instance_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error("DescribeDBInstances", err)),
        }
    }

    async fn restore_from_snapshot(
        &self,
        request: &RestoreRequest,
    ) -> Result<CreateOutcome<DependentInstance>, RegistryError> {
        let result = self
            .client
            .restore_db_instance_from_db_snapshot()
            .db_instance_identifier(&request.target_id)
            .db_snapshot_identifier(&request.snapshot_id)
            .db_subnet_group_name(&request.config.subnet_group)
            .db_instance_class(&request.config.instance_class)
            .send()
            .await;

        match result {
            Ok(out) => {
                let instance = out.db_instance().ok_or_else(|| RegistryError::Malformed {
                    operation: "RestoreDBInstanceFromDBSnapshot",
                    detail: "missing DBInstance".into(),
                })?;
                Ok(CreateOutcome::Created(to_instance(instance)?))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_instance_already_exists_fault()) =>
            {
                let existing = self
                    .describe_instance(&request.target_id)
                    .await?
                    .ok_or_else(|| RegistryError::Malformed {
                        operation: "RestoreDBInstanceFromDBSnapshot",
                        detail: format!(
                            "'{}' reported as existing but not found",
                            request.target_id
                        ),
                    })?;
                Ok(CreateOutcome::AlreadyExists(existing))
            }
            Err(err) => Err(sdk_error("RestoreDBInstanceFromDBSnapshot", err)),
        }
    }

    async fn delete_instance(&self, identifier: &str) -> Result<DeleteOutcome, RegistryError> {
        let result = self
            .client
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(true)
            .delete_automated_backups(true)
            .send()
            .await;

        match result {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_db_instance_not_found_fault()) =>
            {
                Ok(DeleteOutcome::NotFound)
            }
            Err(err) => Err(sdk_error("DeleteDBInstance", err)),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn sdk_error<E: std::error::Error>(operation: &'static str, err: E) -> RegistryError {
    RegistryError::Sdk {
        operation,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn to_chrono(t: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

/// Shared snapshots without an ARN, source instance or creation time cannot
/// be copied and are skipped.
fn to_shared(snapshot: &DbSnapshot) -> Option<SharedSnapshot> {
    let identifier = snapshot.db_snapshot_identifier()?;
    let (Some(arn), Some(owning_id), Some(created_at)) = (
        snapshot.db_snapshot_arn(),
        snapshot.db_instance_identifier(),
        snapshot.snapshot_create_time().and_then(to_chrono),
    ) else {
        tracing::debug!(snapshot = identifier, "Skipping incomplete shared snapshot");
        return None;
    };

    Some(SharedSnapshot {
        identifier: identifier.to_string(),
        arn: arn.to_string(),
        owning_id: owning_id.to_string(),
        status: SnapshotStatus::from_str_value(snapshot.status().unwrap_or_default()),
        created_at,
    })
}

fn to_local(snapshot: &DbSnapshot) -> Result<LocalSnapshotCopy, RegistryError> {
    let identifier = snapshot
        .db_snapshot_identifier()
        .ok_or_else(|| RegistryError::Malformed {
            operation: "DescribeDBSnapshots",
            detail: "snapshot without DBSnapshotIdentifier".into(),
        })?;

    Ok(LocalSnapshotCopy {
        identifier: identifier.to_string(),
        owning_id: snapshot
            .db_instance_identifier()
            .unwrap_or_default()
            .to_string(),
        status: SnapshotStatus::from_str_value(snapshot.status().unwrap_or_default()),
        created_at: snapshot.snapshot_create_time().and_then(to_chrono),
    })
}

fn to_instance(instance: &DbInstance) -> Result<DependentInstance, RegistryError> {
    let identifier = instance
        .db_instance_identifier()
        .ok_or_else(|| RegistryError::Malformed {
            operation: "DescribeDBInstances",
            detail: "instance without DBInstanceIdentifier".into(),
        })?;

    let endpoint = instance.endpoint().and_then(|e| {
        e.address().map(|address| Endpoint {
            address: address.to_string(),
            port: e.port().and_then(|p| u16::try_from(p).ok()),
        })
    });

    Ok(DependentInstance {
        identifier: identifier.to_string(),
        status: InstanceStatus::from_str_value(instance.db_instance_status().unwrap_or_default()),
        subnet_group: instance
            .db_subnet_group()
            .and_then(|g| g.db_subnet_group_name())
            .map(str::to_string),
        instance_class: instance.db_instance_class().map(str::to_string),
        endpoint,
    })
}
