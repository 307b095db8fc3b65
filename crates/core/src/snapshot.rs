//! Snapshot data model and freshness policy.
//!
//! Pure functions that decide which shared snapshot is current, which local
//! copy tracks it, and whether that copy has to be refreshed. Nothing here
//! talks to the registry; callers pass in what they have listed.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STATUS_CREATING: &str = "creating";
pub const STATUS_AVAILABLE: &str = "available";

/// Infix placed between the owning identifier and the source timestamp.
pub const COPY_INFIX: &str = "-copy-";

/// Timestamp layout used as the copy identifier suffix.
const COPY_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// Maximum length of a DB instance identifier.
pub const MAX_INSTANCE_IDENTIFIER_LEN: usize = 63;

/// Maximum length of a DB snapshot identifier.
pub const MAX_SNAPSHOT_IDENTIFIER_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status reported for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    Creating,
    Available,
    /// Any other status string the registry reports (`copying`, `deleting`, ...).
    Other(String),
}

impl SnapshotStatus {
    /// Parse the registry's status string. Unknown values are kept verbatim.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            STATUS_CREATING => Self::Creating,
            STATUS_AVAILABLE => Self::Available,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => STATUS_CREATING,
            Self::Available => STATUS_AVAILABLE,
            Self::Other(s) => s,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SnapshotStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// A snapshot owned by the upstream account and shared with this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedSnapshot {
    pub identifier: String,
    /// Full ARN; cross-account copies must name the source by ARN.
    pub arn: String,
    /// Identifier of the database the snapshot was taken from.
    pub owning_id: String,
    pub status: SnapshotStatus,
    pub created_at: DateTime<Utc>,
}

/// A snapshot re-encrypted under a local key and usable as a restore source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalSnapshotCopy {
    pub identifier: String,
    pub owning_id: String,
    pub status: SnapshotStatus,
    /// Absent while the copy is still being created.
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Freshness policy
// ---------------------------------------------------------------------------

/// Pick the most recent `available` shared snapshot taken from `owning_id`.
pub fn newest_available_shared<'a>(
    snapshots: &'a [SharedSnapshot],
    owning_id: &str,
) -> Option<&'a SharedSnapshot> {
    snapshots
        .iter()
        .filter(|s| s.status.is_available() && s.owning_id == owning_id)
        .max_by_key(|s| s.created_at)
}

/// Pick the most recent `available` local copy that carries a creation
/// timestamp. Copies being created or deleted are never reused.
pub fn newest_local(copies: &[LocalSnapshotCopy]) -> Option<&LocalSnapshotCopy> {
    copies
        .iter()
        .filter(|c| c.status.is_available())
        .filter_map(|c| c.created_at.map(|t| (t, c)))
        .max_by_key(|(t, _)| *t)
        .map(|(_, c)| c)
}

/// Whether `local` has to be replaced by a fresh copy of `shared`.
///
/// True when there is no timestamped local copy or when it is strictly older
/// than the shared snapshot. Equal timestamps count as fresh.
pub fn needs_refresh(shared: &SharedSnapshot, local: Option<&LocalSnapshotCopy>) -> bool {
    match local.and_then(|c| c.created_at) {
        None => true,
        Some(local_time) => local_time < shared.created_at,
    }
}

/// Copies made by this tool (named `<owning_id>-copy-...`) that predate
/// `shared` and are not `keep`. Other manual snapshots are never touched.
pub fn superseded_copies<'a>(
    copies: &'a [LocalSnapshotCopy],
    shared: &SharedSnapshot,
    keep: &str,
) -> Vec<&'a LocalSnapshotCopy> {
    let prefix = format!("{}{COPY_INFIX}", shared.owning_id);
    copies
        .iter()
        .filter(|c| c.identifier != keep && c.identifier.starts_with(&prefix))
        .filter(|c| matches!(c.created_at, Some(t) if t < shared.created_at))
        .collect()
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Deterministic copy target identifier for a shared snapshot.
///
/// Every run copying the same source picks the same name, so a concurrent
/// copy shows up as "already exists". A newer source yields a new name.
pub fn copy_identifier(shared: &SharedSnapshot) -> Result<String, CoreError> {
    let id = format!(
        "{}{COPY_INFIX}{}",
        shared.owning_id,
        shared.created_at.format(COPY_SUFFIX_FORMAT)
    );
    validate_identifier(&id, MAX_SNAPSHOT_IDENTIFIER_LEN)?;
    Ok(id)
}

/// Validate a DB instance identifier.
pub fn validate_instance_identifier(id: &str) -> Result<(), CoreError> {
    validate_identifier(id, MAX_INSTANCE_IDENTIFIER_LEN)
}

/// Registry naming rules: starts with a letter, ASCII letters, digits and
/// hyphens only, no doubled or trailing hyphen.
pub fn validate_identifier(id: &str, max_len: usize) -> Result<(), CoreError> {
    let reason = if id.is_empty() {
        "is empty".to_string()
    } else if id.len() > max_len {
        format!("exceeds {max_len} characters")
    } else if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        "must start with a letter".to_string()
    } else if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        "may only contain letters, digits and hyphens".to_string()
    } else if id.contains("--") || id.ends_with('-') {
        "must not contain '--' or end with '-'".to_string()
    } else {
        return Ok(());
    };
    Err(CoreError::InvalidIdentifier(format!("'{id}' {reason}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
