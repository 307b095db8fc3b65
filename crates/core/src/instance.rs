//! Dependent database instance model.

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

pub const INSTANCE_CREATING: &str = "creating";
pub const INSTANCE_AVAILABLE: &str = "available";
pub const INSTANCE_APPLYING: &str = "applying";
pub const INSTANCE_DELETING: &str = "deleting";

/// Lifecycle status reported for a database instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Creating,
    Available,
    /// Modifications are being applied; the instance is reachable.
    Applying,
    Deleting,
    Other(String),
}

impl InstanceStatus {
    pub fn from_str_value(s: &str) -> Self {
        match s {
            INSTANCE_CREATING => Self::Creating,
            INSTANCE_AVAILABLE => Self::Available,
            INSTANCE_APPLYING => Self::Applying,
            INSTANCE_DELETING => Self::Deleting,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => INSTANCE_CREATING,
            Self::Available => INSTANCE_AVAILABLE,
            Self::Applying => INSTANCE_APPLYING,
            Self::Deleting => INSTANCE_DELETING,
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InstanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// Network address of a database instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub address: String,
    pub port: Option<u16>,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Placement settings copied from a reference instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceConfig {
    pub subnet_group: String,
    pub instance_class: String,
}

/// An instance as reported by the registry.
///
/// `subnet_group` and `instance_class` are optional because the registry may
/// omit them for instances that are still being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentInstance {
    pub identifier: String,
    pub status: InstanceStatus,
    pub subnet_group: Option<String>,
    pub instance_class: Option<String>,
    /// Assigned once the instance is reachable.
    pub endpoint: Option<Endpoint>,
}

/// Parameters for restoring an instance from a local snapshot copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub target_id: String,
    pub snapshot_id: String,
    pub config: InstanceConfig,
}
