//! Terminal progress bar for readiness waits.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use snapvault_cloud::{ProgressSink, WaitOutcome};

const TEMPLATE: &str = "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})";

struct ActiveBar {
    bar: ProgressBar,
    label: String,
}

/// Renders each wait as an indicatif bar with one step per tick.
#[derive(Default)]
pub struct BarProgress {
    active: Mutex<Option<ActiveBar>>,
}

impl ProgressSink for BarProgress {
    fn start(&self, label: &str, total_ticks: u32) {
        let bar = ProgressBar::new(u64::from(total_ticks));
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(label.to_string());

        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.take() {
                previous.bar.abandon();
            }
            *active = Some(ActiveBar {
                bar,
                label: label.to_string(),
            });
        }
    }

    fn tick(&self, tick: u32, status: Option<&str>) {
        if let Ok(active) = self.active.lock() {
            if let Some(active) = active.as_ref() {
                active.bar.set_position(u64::from(tick));
                if let Some(status) = status {
                    active.bar.set_message(format!("{} ({status})", active.label));
                }
            }
        }
    }

    fn finish(&self, outcome: WaitOutcome) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(active) = active.take() {
                match outcome {
                    WaitOutcome::Ready => {
                        active.bar.finish_with_message(format!("{} -- ready", active.label))
                    }
                    WaitOutcome::TimedOut => active
                        .bar
                        .abandon_with_message(format!("{} -- timed out", active.label)),
                    WaitOutcome::Failed => active
                        .bar
                        .abandon_with_message(format!("{} -- failed", active.label)),
                }
            }
        }
    }
}
