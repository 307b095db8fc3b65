//! Registry traits for the external snapshot and instance services.
//!
//! The lifecycle manager only ever talks to these traits. The AWS RDS
//! implementation lives in [`crate::aws`]; tests substitute in-memory ones.

use async_trait::async_trait;
use snapvault_core::instance::{DependentInstance, RestoreRequest};
use snapvault_core::snapshot::{LocalSnapshotCopy, SharedSnapshot};

use crate::error::RegistryError;

/// Result of a create call that tolerates a concurrent creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome<T> {
    /// The request was accepted; the resource is being created.
    Created(T),
    /// A resource with the requested identifier already exists.
    AlreadyExists(T),
}

impl<T> CreateOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Created(t) | Self::AlreadyExists(t) => t,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Result of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Shared and local snapshot operations.
#[async_trait]
pub trait SnapshotRegistry: Send + Sync {
    /// All snapshots shared with this account, in any status.
    async fn list_shared(&self) -> Result<Vec<SharedSnapshot>, RegistryError>;

    /// Local (manual) snapshots taken from `owning_id`.
    async fn list_local(&self, owning_id: &str) -> Result<Vec<LocalSnapshotCopy>, RegistryError>;

    async fn describe_snapshot(
        &self,
        identifier: &str,
    ) -> Result<Option<LocalSnapshotCopy>, RegistryError>;

    /// Copy `source` into a local snapshot named `target_id`, re-encrypted with
    /// `kms_key_id`. An existing `target_id` yields
    /// [`CreateOutcome::AlreadyExists`] carrying that snapshot.
    async fn copy_snapshot(
        &self,
        source: &SharedSnapshot,
        target_id: &str,
        kms_key_id: &str,
    ) -> Result<CreateOutcome<LocalSnapshotCopy>, RegistryError>;

    async fn delete_snapshot(&self, identifier: &str) -> Result<DeleteOutcome, RegistryError>;
}

/// Database instance operations.
#[async_trait]
pub trait InstanceRegistry: Send + Sync {
    async fn describe_instance(
        &self,
        identifier: &str,
    ) -> Result<Option<DependentInstance>, RegistryError>;

    /// Restore a new instance from a local snapshot. An existing target
    /// yields [`CreateOutcome::AlreadyExists`] carrying that instance.
    async fn restore_from_snapshot(
        &self,
        request: &RestoreRequest,
    ) -> Result<CreateOutcome<DependentInstance>, RegistryError>;

    /// Delete without a final snapshot, removing automated backups.
    async fn delete_instance(&self, identifier: &str) -> Result<DeleteOutcome, RegistryError>;
}
