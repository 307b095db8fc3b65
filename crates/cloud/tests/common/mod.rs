//! Shared fixtures for lifecycle integration tests.
//!
//! [`FakeRds`] is an in-memory stand-in for both registries. Copies and
//! restores start in `creating` and flip to `available` after a configurable
//! number of describe calls. [`ManualClock`] advances on `sleep` so waits
//! finish instantly.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use snapvault_cloud::{
    Clock, CreateOutcome, DeleteOutcome, InstanceRegistry, ProgressSink, RegistryError,
    SnapshotLifecycleManager, SnapshotRegistry, WaitOutcome,
};
use snapvault_core::instance::{DependentInstance, Endpoint, InstanceStatus, RestoreRequest};
use snapvault_core::polling::WaitConfig;
use snapvault_core::settings::LifecycleSettings;
use snapvault_core::snapshot::{LocalSnapshotCopy, SharedSnapshot, SnapshotStatus};

pub const OWNER: &str = "orders-db";
pub const TARGET: &str = "orders-db-anon";
pub const REFERENCE: &str = "orders-db-prod";
pub const KMS_KEY: &str = "alias/shared_kms";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }

    pub fn slept(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }
}

// ---------------------------------------------------------------------------
// RecordingProgress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Start(String, u32),
    Tick(u32, Option<String>),
    Finish(WaitOutcome),
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn start(&self, label: &str, total_ticks: u32) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Start(label.to_string(), total_ticks));
    }

    fn tick(&self, tick: u32, status: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Tick(tick, status.map(str::to_string)));
    }

    fn finish(&self, outcome: WaitOutcome) {
        self.events.lock().unwrap().push(ProgressEvent::Finish(outcome));
    }
}

// ---------------------------------------------------------------------------
// FakeRds
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    shared: Vec<SharedSnapshot>,
    local: BTreeMap<String, LocalSnapshotCopy>,
    instances: BTreeMap<String, DependentInstance>,
    /// Remaining describe calls before a pending resource becomes available.
    pending: BTreeMap<String, u32>,
    copy_calls: Vec<String>,
    restore_calls: Vec<RestoreRequest>,
    deleted_snapshots: Vec<String>,
    deleted_instances: Vec<String>,
    /// Copy targets that another process "created" right before our call.
    racing_copies: Vec<String>,
}

pub struct FakeRds {
    clock: Arc<ManualClock>,
    state: Mutex<State>,
    /// Describes before a new copy turns `available`.
    pub copy_ready_after: u32,
    /// Describes before a restored instance turns `available`.
    pub restore_ready_after: u32,
}

impl FakeRds {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            state: Mutex::new(State::default()),
            copy_ready_after: 1,
            restore_ready_after: 1,
        }
    }

    pub fn add_shared(&self, owner: &str, id: &str, status: SnapshotStatus, created: DateTime<Utc>) {
        self.state.lock().unwrap().shared.push(SharedSnapshot {
            identifier: id.to_string(),
            arn: format!("arn:aws:rds:eu-central-1:999999999999:snapshot:{id}"),
            owning_id: owner.to_string(),
            status,
            created_at: created,
        });
    }

    pub fn add_local(&self, id: &str, created: Option<DateTime<Utc>>) {
        let status = if created.is_some() {
            SnapshotStatus::Available
        } else {
            SnapshotStatus::Creating
        };
        self.state.lock().unwrap().local.insert(
            id.to_string(),
            LocalSnapshotCopy {
                identifier: id.to_string(),
                owning_id: OWNER.to_string(),
                status,
                created_at: created,
            },
        );
    }

    pub fn add_instance(&self, id: &str, status: InstanceStatus, with_endpoint: bool) {
        self.state.lock().unwrap().instances.insert(
            id.to_string(),
            DependentInstance {
                identifier: id.to_string(),
                status,
                subnet_group: Some("private-subnets".to_string()),
                instance_class: Some("db.r6g.large".to_string()),
                endpoint: with_endpoint.then(|| endpoint_for(id)),
            },
        );
    }

    pub fn insert_local(&self, copy: LocalSnapshotCopy) {
        self.state
            .lock()
            .unwrap()
            .local
            .insert(copy.identifier.clone(), copy);
    }

    pub fn insert_instance(&self, instance: DependentInstance) {
        self.state
            .lock()
            .unwrap()
            .instances
            .insert(instance.identifier.clone(), instance);
    }

    /// Keep `id` in its current status for the next `describes` describe calls.
    pub fn delay(&self, id: &str, describes: u32) {
        self.state
            .lock()
            .unwrap()
            .pending
            .insert(id.to_string(), describes);
    }

    /// Keep `id` in its current status forever.
    pub fn hold(&self, id: &str) {
        self.delay(id, u32::MAX);
    }

    /// Make the next copy to `target` collide with a concurrent creator.
    pub fn race_copy(&self, target: &str) {
        self.state
            .lock()
            .unwrap()
            .racing_copies
            .push(target.to_string());
    }

    pub fn copy_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().copy_calls.clone()
    }

    pub fn restore_calls(&self) -> Vec<RestoreRequest> {
        self.state.lock().unwrap().restore_calls.clone()
    }

    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_snapshots.clone()
    }

    pub fn deleted_instances(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_instances.clone()
    }

    pub fn local_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().local.keys().cloned().collect()
    }

    pub fn local(&self, id: &str) -> Option<LocalSnapshotCopy> {
        self.state.lock().unwrap().local.get(id).cloned()
    }
}

pub fn endpoint_for(id: &str) -> Endpoint {
    Endpoint {
        address: format!("{id}.fake.eu-central-1.rds.amazonaws.com"),
        port: Some(5432),
    }
}

/// Count down a pending resource; true once it should be available.
fn tick_pending(state: &mut State, id: &str) -> bool {
    match state.pending.get_mut(id) {
        None => true,
        Some(remaining) => {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                state.pending.remove(id);
                true
            } else {
                false
            }
        }
    }
}

#[async_trait]
impl SnapshotRegistry for FakeRds {
    async fn list_shared(&self) -> Result<Vec<SharedSnapshot>, RegistryError> {
        Ok(self.state.lock().unwrap().shared.clone())
    }

    async fn list_local(&self, owning_id: &str) -> Result<Vec<LocalSnapshotCopy>, RegistryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .local
            .values()
            .filter(|c| c.owning_id == owning_id)
            .cloned()
            .collect())
    }

    async fn describe_snapshot(
        &self,
        identifier: &str,
    ) -> Result<Option<LocalSnapshotCopy>, RegistryError> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if !state.local.contains_key(identifier) {
            return Ok(None);
        }
        if tick_pending(&mut state, identifier) {
            if let Some(copy) = state.local.get_mut(identifier) {
                if !copy.status.is_available() {
                    copy.status = SnapshotStatus::Available;
                    copy.created_at = Some(now);
                }
            }
        }
        Ok(state.local.get(identifier).cloned())
    }

    async fn copy_snapshot(
        &self,
        source: &SharedSnapshot,
        target_id: &str,
        _kms_key_id: &str,
    ) -> Result<CreateOutcome<LocalSnapshotCopy>, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.copy_calls.push(target_id.to_string());

        let copy = LocalSnapshotCopy {
            identifier: target_id.to_string(),
            owning_id: source.owning_id.clone(),
            status: SnapshotStatus::Creating,
            created_at: None,
        };

        if let Some(pos) = state.racing_copies.iter().position(|t| t == target_id) {
            state.racing_copies.remove(pos);
            state.local.insert(target_id.to_string(), copy.clone());
            state.pending.insert(target_id.to_string(), self.copy_ready_after);
        }

        if let Some(existing) = state.local.get(target_id) {
            return Ok(CreateOutcome::AlreadyExists(existing.clone()));
        }

        state.local.insert(target_id.to_string(), copy.clone());
        state.pending.insert(target_id.to_string(), self.copy_ready_after);
        Ok(CreateOutcome::Created(copy))
    }

    async fn delete_snapshot(&self, identifier: &str) -> Result<DeleteOutcome, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.deleted_snapshots.push(identifier.to_string());
        Ok(match state.local.remove(identifier) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

#[async_trait]
impl InstanceRegistry for FakeRds {
    async fn describe_instance(
        &self,
        identifier: &str,
    ) -> Result<Option<DependentInstance>, RegistryError> {
        let mut state = self.state.lock().unwrap();
        if !state.instances.contains_key(identifier) {
            return Ok(None);
        }
        if tick_pending(&mut state, identifier) {
            if let Some(instance) = state.instances.get_mut(identifier) {
                if instance.status == InstanceStatus::Creating {
                    instance.status = InstanceStatus::Available;
                    instance.endpoint = Some(endpoint_for(identifier));
                }
            }
        }
        Ok(state.instances.get(identifier).cloned())
    }

    async fn restore_from_snapshot(
        &self,
        request: &RestoreRequest,
    ) -> Result<CreateOutcome<DependentInstance>, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.restore_calls.push(request.clone());

        if let Some(existing) = state.instances.get(&request.target_id) {
            return Ok(CreateOutcome::AlreadyExists(existing.clone()));
        }

        let instance = DependentInstance {
            identifier: request.target_id.clone(),
            status: InstanceStatus::Creating,
            subnet_group: Some(request.config.subnet_group.clone()),
            instance_class: Some(request.config.instance_class.clone()),
            endpoint: None,
        };
        state
            .instances
            .insert(request.target_id.clone(), instance.clone());
        state
            .pending
            .insert(request.target_id.clone(), self.restore_ready_after);
        Ok(CreateOutcome::Created(instance))
    }

    async fn delete_instance(&self, identifier: &str) -> Result<DeleteOutcome, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.deleted_instances.push(identifier.to_string());
        Ok(match state.instances.remove(identifier) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Settings with the real timing defaults and a KMS key.
pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        kms_key_id: Some(KMS_KEY.to_string()),
        ..Default::default()
    }
}

/// Settings with no warm-up so every tick polls.
pub fn eager_settings() -> LifecycleSettings {
    LifecycleSettings {
        wait: WaitConfig {
            warmup: Duration::ZERO,
            ..WaitConfig::default()
        },
        ..settings()
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub rds: Arc<FakeRds>,
    pub progress: Arc<RecordingProgress>,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let clock = ManualClock::starting_at(now);
        let rds = Arc::new(FakeRds::new(clock.clone()));
        Self {
            clock,
            rds,
            progress: Arc::new(RecordingProgress::default()),
        }
    }

    pub fn with_rds(now: DateTime<Utc>, configure: impl FnOnce(&mut FakeRds)) -> Self {
        let clock = ManualClock::starting_at(now);
        let mut rds = FakeRds::new(clock.clone());
        configure(&mut rds);
        Self {
            clock,
            rds: Arc::new(rds),
            progress: Arc::new(RecordingProgress::default()),
        }
    }

    pub fn manager(&self, settings: LifecycleSettings) -> SnapshotLifecycleManager {
        SnapshotLifecycleManager::new(self.rds.clone(), self.rds.clone(), settings)
            .unwrap()
            .with_clock(self.clock.clone())
            .with_progress(self.progress.clone())
    }
}
