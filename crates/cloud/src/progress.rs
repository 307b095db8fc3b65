//! Progress reporting for long readiness waits.

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    /// A describe call failed and the wait was abandoned.
    Failed,
}

/// Receives per-tick updates while a resource is being waited on.
///
/// One sink may see several waits in sequence; each starts with
/// [`ProgressSink::start`] and ends with [`ProgressSink::finish`].
pub trait ProgressSink: Send + Sync {
    fn start(&self, label: &str, total_ticks: u32);

    /// `status` is the last observed status, if any poll has happened yet.
    fn tick(&self, tick: u32, status: Option<&str>);

    fn finish(&self, outcome: WaitOutcome);
}

/// Default sink: per-tick `tracing` debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn start(&self, label: &str, total_ticks: u32) {
        tracing::debug!(total_ticks, "{label}");
    }

    fn tick(&self, tick: u32, status: Option<&str>) {
        tracing::debug!(tick, status = status.unwrap_or("-"), "Wait tick");
    }

    fn finish(&self, outcome: WaitOutcome) {
        tracing::debug!(?outcome, "Wait finished");
    }
}
