use snapvault_core::polling::ResourceKind;
use snapvault_core::CoreError;

/// Failure talking to a registry backend.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The SDK call itself failed (transport, auth, throttling, service fault).
    #[error("{operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    /// The call succeeded but the response lacked a field we rely on.
    #[error("{operation} returned an incomplete response: {detail}")]
    Malformed {
        operation: &'static str,
        detail: String,
    },
}

/// Errors surfaced by [`SnapshotLifecycleManager`](crate::SnapshotLifecycleManager).
///
/// "Already exists" on create and "not found" on delete are not errors; the
/// registries report them through
/// [`CreateOutcome`](crate::registry::CreateOutcome) and
/// [`DeleteOutcome`](crate::registry::DeleteOutcome).
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("No available shared snapshot found for '{owning_id}'")]
    NoSharedSnapshot { owning_id: String },

    #[error(
        "Timed out waiting for {kind} '{identifier}' after {ticks} ticks (last status: {})",
        .last_status.as_deref().unwrap_or("unknown")
    )]
    Timeout {
        kind: ResourceKind,
        identifier: String,
        ticks: u32,
        last_status: Option<String>,
    },

    #[error("Reference instance '{identifier}' not found")]
    ReferenceNotFound { identifier: String },

    #[error("Reference instance '{identifier}' has no {field}")]
    ReferenceIncomplete {
        identifier: String,
        field: &'static str,
    },

    #[error("Instance '{identifier}' has no endpoint (status: {status})")]
    MissingEndpoint { identifier: String, status: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
