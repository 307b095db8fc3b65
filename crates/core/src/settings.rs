//! Tunables for the snapshot lifecycle.

use chrono::Duration;

use crate::error::CoreError;
use crate::polling::WaitConfig;
use crate::retention::DEFAULT_RETENTION_DAYS;

/// Settings shared by every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Local copies older than this may be deleted.
    pub retention: Duration,
    /// Readiness wait timing, used for both snapshots and instances.
    pub wait: WaitConfig,
    /// KMS key (ARN or alias) local copies are re-encrypted with.
    pub kms_key_id: Option<String>,
    /// Delete older copies once a fresh one is available.
    pub prune_superseded: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
            wait: WaitConfig::default(),
            kms_key_id: None,
            prune_superseded: true,
        }
    }
}

impl LifecycleSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.retention <= Duration::zero() {
            return Err(CoreError::Validation(
                "Retention window must be positive".into(),
            ));
        }
        self.wait.validate()
    }

    /// The KMS key for copy operations, or a validation error if unset.
    pub fn require_kms_key(&self) -> Result<&str, CoreError> {
        match self.kms_key_id.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(CoreError::Validation(
                "A KMS key id is required to copy a shared snapshot".into(),
            )),
        }
    }
}
