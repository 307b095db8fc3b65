//! Snapshot lifecycle orchestration against managed-database registries.
//!
//! - [`SnapshotLifecycleManager`]: keeps a local copy of the newest shared
//!   snapshot fresh, prunes old copies, and provisions dependent instances.
//! - [`registry`]: the `async-trait` seams the manager talks through.
//! - [`RdsRegistry`]: AWS RDS implementation of both registries.
//! - [`Clock`] / [`ProgressSink`]: time and progress seams for long waits.

pub mod aws;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod progress;
pub mod registry;
pub mod wait;

pub use aws::RdsRegistry;
pub use clock::{Clock, SystemClock};
pub use error::{LifecycleError, RegistryError};
pub use lifecycle::SnapshotLifecycleManager;
pub use progress::{LogProgress, ProgressSink, WaitOutcome};
pub use registry::{CreateOutcome, DeleteOutcome, InstanceRegistry, SnapshotRegistry};
pub use wait::ResourceState;
