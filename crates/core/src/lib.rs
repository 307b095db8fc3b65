//! Pure domain logic for managed-database snapshot lifecycles.
//!
//! - [`snapshot`]: shared/local snapshot model and the freshness policy.
//! - [`retention`]: age-based pruning of local copies.
//! - [`instance`]: dependent instance model.
//! - [`polling`]: bounded readiness wait schedule.
//! - [`settings`]: lifecycle tunables and their defaults.
//!
//! No I/O happens in this crate; registry access lives in `snapvault-cloud`.

pub mod error;
pub mod instance;
pub mod polling;
pub mod retention;
pub mod settings;
pub mod snapshot;

pub use error::CoreError;
