//! Readiness polling against the registries.
//!
//! Walks a [`WaitPlan`] tick by tick: ticks inside the warm-up window only
//! sleep, later ticks describe the resource and stop as soon as its status
//! is in the good set for its kind.

use std::future::Future;

use serde::Serialize;
use snapvault_core::instance::DependentInstance;
use snapvault_core::polling::{ResourceKind, WaitConfig};
use snapvault_core::snapshot::LocalSnapshotCopy;

use crate::error::{LifecycleError, RegistryError};
use crate::lifecycle::SnapshotLifecycleManager;
use crate::progress::WaitOutcome;

/// The last observed state of a resource that became ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceState {
    Instance(DependentInstance),
    Snapshot(LocalSnapshotCopy),
}

impl ResourceState {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Instance(_) => ResourceKind::Instance,
            Self::Snapshot(_) => ResourceKind::Snapshot,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            Self::Instance(i) => i.status.as_str(),
            Self::Snapshot(s) => s.status.as_str(),
        }
    }
}

/// Something with a registry status string.
trait Observed {
    fn status_str(&self) -> &str;
}

impl Observed for LocalSnapshotCopy {
    fn status_str(&self) -> &str {
        self.status.as_str()
    }
}

impl Observed for DependentInstance {
    fn status_str(&self) -> &str {
        self.status.as_str()
    }
}

impl SnapshotLifecycleManager {
    /// Wait for `identifier` using the configured wait settings.
    pub async fn await_ready(
        &self,
        kind: ResourceKind,
        identifier: &str,
    ) -> Result<ResourceState, LifecycleError> {
        self.await_ready_with(kind, identifier, self.settings().wait)
            .await
    }

    /// Wait for `identifier` with explicit timing.
    pub async fn await_ready_with(
        &self,
        kind: ResourceKind,
        identifier: &str,
        wait: WaitConfig,
    ) -> Result<ResourceState, LifecycleError> {
        match kind {
            ResourceKind::Snapshot => self
                .poll_until_ready(kind, identifier, wait, || {
                    self.snapshots.describe_snapshot(identifier)
                })
                .await
                .map(ResourceState::Snapshot),
            ResourceKind::Instance => self
                .poll_until_ready(kind, identifier, wait, || {
                    self.instances.describe_instance(identifier)
                })
                .await
                .map(ResourceState::Instance),
        }
    }

    pub(crate) async fn wait_for_snapshot(
        &self,
        identifier: &str,
    ) -> Result<LocalSnapshotCopy, LifecycleError> {
        self.poll_until_ready(
            ResourceKind::Snapshot,
            identifier,
            self.settings().wait,
            || self.snapshots.describe_snapshot(identifier),
        )
        .await
    }

    pub(crate) async fn wait_for_instance(
        &self,
        identifier: &str,
    ) -> Result<DependentInstance, LifecycleError> {
        self.poll_until_ready(
            ResourceKind::Instance,
            identifier,
            self.settings().wait,
            || self.instances.describe_instance(identifier),
        )
        .await
    }

    async fn poll_until_ready<T, F, Fut>(
        &self,
        kind: ResourceKind,
        identifier: &str,
        wait: WaitConfig,
        describe: F,
    ) -> Result<T, LifecycleError>
    where
        T: Observed,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>, RegistryError>>,
    {
        let plan = wait.plan()?;
        let label = match kind {
            ResourceKind::Instance => "Waiting for RDS instance to be stable",
            ResourceKind::Snapshot => "Waiting for RDS snapshot to be available",
        };

        tracing::info!(
            kind = %kind,
            identifier,
            total_ticks = plan.total_ticks(),
            warmup_ticks = plan.warmup_ticks(),
            interval_secs = plan.interval().as_secs(),
            "{label}",
        );
        self.progress.start(label, plan.total_ticks());

        let mut last_status: Option<String> = None;

        for tick in plan.ticks() {
            if tick.poll {
                match describe().await {
                    Ok(Some(resource)) => {
                        let status = resource.status_str();
                        tracing::debug!(kind = %kind, identifier, tick = tick.number, status, "Polled");
                        if kind.is_good(status) {
                            self.progress.tick(tick.number, Some(status));
                            self.progress.finish(WaitOutcome::Ready);
                            tracing::info!(kind = %kind, identifier, status, "Resource is ready");
                            return Ok(resource);
                        }
                        last_status = Some(status.to_string());
                    }
                    Ok(None) => {
                        tracing::debug!(kind = %kind, identifier, tick = tick.number, "Not visible yet");
                    }
                    Err(e) => {
                        self.progress.finish(WaitOutcome::Failed);
                        return Err(e.into());
                    }
                }
            }
            self.progress.tick(tick.number, last_status.as_deref());
            self.clock.sleep(plan.interval()).await;
        }

        self.progress.finish(WaitOutcome::TimedOut);
        tracing::warn!(
            kind = %kind,
            identifier,
            last_status = last_status.as_deref().unwrap_or("unknown"),
            "Wait timed out",
        );
        Err(LifecycleError::Timeout {
            kind,
            identifier: identifier.to_string(),
            ticks: plan.total_ticks(),
            last_status,
        })
    }
}
