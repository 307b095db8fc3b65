//! Bounded readiness polling plan.
//!
//! A wait is a fixed number of ticks, one per poll interval. The first
//! ticks fall inside a warm-up window during which transitions are known
//! not to finish, so no describe call is made for them. [`WaitPlan`] only
//! computes the schedule; the caller drives it with its own clock.

use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;
use crate::instance::{INSTANCE_APPLYING, INSTANCE_AVAILABLE};
use crate::snapshot::STATUS_AVAILABLE;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default overall wait budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1500);

/// Default spacing between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default window during which no polling happens.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(60);

const INSTANCE_GOOD_STATUSES: &[&str] = &[INSTANCE_AVAILABLE, INSTANCE_APPLYING];
const SNAPSHOT_GOOD_STATUSES: &[&str] = &[STATUS_AVAILABLE];

// ---------------------------------------------------------------------------
// Resource kind
// ---------------------------------------------------------------------------

/// The kind of external resource being waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Instance,
    Snapshot,
}

impl ResourceKind {
    /// Statuses that end a wait successfully.
    pub fn good_statuses(self) -> &'static [&'static str] {
        match self {
            Self::Instance => INSTANCE_GOOD_STATUSES,
            Self::Snapshot => SNAPSHOT_GOOD_STATUSES,
        }
    }

    pub fn is_good(self, status: &str) -> bool {
        self.good_statuses().contains(&status)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Snapshot => "snapshot",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// WaitConfig
// ---------------------------------------------------------------------------

/// Timing parameters for a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub warmup: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl WaitConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Validation(
                "Poll interval must be greater than zero".into(),
            ));
        }
        if self.timeout < self.poll_interval {
            return Err(CoreError::Validation(format!(
                "Poll timeout ({}s) must not be shorter than the poll interval ({}s)",
                self.timeout.as_secs(),
                self.poll_interval.as_secs()
            )));
        }
        Ok(())
    }

    /// Build the tick schedule. Fails on an invalid configuration.
    pub fn plan(&self) -> Result<WaitPlan, CoreError> {
        self.validate()?;
        let interval = self.poll_interval.as_nanos();
        let total = (self.timeout.as_nanos() / interval).max(1);
        let warmup = self.warmup.as_nanos() / interval;
        Ok(WaitPlan {
            total_ticks: u32::try_from(total).unwrap_or(u32::MAX),
            warmup_ticks: u32::try_from(warmup).unwrap_or(u32::MAX),
            interval: self.poll_interval,
        })
    }
}

// ---------------------------------------------------------------------------
// WaitPlan
// ---------------------------------------------------------------------------

/// One step of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based tick number.
    pub number: u32,
    /// Whether the resource should be described on this tick.
    pub poll: bool,
}

/// Precomputed tick schedule for a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPlan {
    total_ticks: u32,
    warmup_ticks: u32,
    interval: Duration,
}

impl WaitPlan {
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    pub fn warmup_ticks(&self) -> u32 {
        self.warmup_ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks past the warm-up window are polled.
    pub fn should_poll(&self, tick: u32) -> bool {
        tick > self.warmup_ticks
    }

    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        (1..=self.total_ticks).map(move |number| Tick {
            number,
            poll: self.should_poll(number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_give_three_hundred_ticks_with_twelve_skipped() {
        let plan = WaitConfig::default().plan().unwrap();
        assert_eq!(plan.total_ticks(), 300);
        assert_eq!(plan.warmup_ticks(), 12);
        assert!(!plan.should_poll(12));
        assert!(plan.should_poll(13));
        assert_eq!(plan.ticks().filter(|t| t.poll).count(), 288);
    }

    #[test]
    fn short_timeout_budget() {
        let plan = WaitConfig {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            ..Default::default()
        }
        .plan()
        .unwrap();
        assert_eq!(plan.total_ticks(), 6);
        assert!(plan.ticks().all(|t| !t.poll));
    }

    #[test]
    fn no_warmup_polls_every_tick() {
        let plan = WaitConfig {
            timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(5),
            warmup: Duration::ZERO,
        }
        .plan()
        .unwrap();
        let ticks: Vec<_> = plan.ticks().collect();
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks[0], Tick { number: 1, poll: true });
        assert_eq!(ticks[3].number, 4);
    }

    #[test]
    fn sub_millisecond_interval_plans_without_panicking() {
        let plan = WaitConfig {
            timeout: Duration::from_secs(1),
            poll_interval: Duration::from_micros(500),
            warmup: Duration::from_millis(1),
        }
        .plan()
        .unwrap();
        assert_eq!(plan.total_ticks(), 2000);
        assert_eq!(plan.warmup_ticks(), 2);
        assert_eq!(plan.interval(), Duration::from_micros(500));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero = WaitConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_matches!(zero.plan(), Err(CoreError::Validation(_)));

        let inverted = WaitConfig {
            timeout: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
            ..Default::default()
        };
        assert_matches!(inverted.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn good_statuses_per_kind() {
        assert!(ResourceKind::Instance.is_good("available"));
        assert!(ResourceKind::Instance.is_good("applying"));
        assert!(!ResourceKind::Instance.is_good("creating"));
        assert!(ResourceKind::Snapshot.is_good("available"));
        assert!(!ResourceKind::Snapshot.is_good("applying"));
    }
}
