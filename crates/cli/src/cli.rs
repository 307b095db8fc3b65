//! CLI structure and argument parsing.
//!
//! Every flag can also be supplied through the environment (a `.env` file is
//! loaded first):
//!
//! | Variable                        | Default | Description                          |
//! |---------------------------------|---------|--------------------------------------|
//! | `SNAPVAULT_SOURCE_DB`           | --      | Database the shared snapshots come from |
//! | `SNAPVAULT_TARGET_DB`           | --      | Instance to restore / destroy        |
//! | `SNAPVAULT_CONFIG_FROM_DB`      | --      | Instance to copy subnet group and class from |
//! | `SNAPVAULT_KMS_KEY_ID`          | --      | Key local copies are encrypted with  |
//! | `SNAPVAULT_RETENTION_DAYS`      | `7`     | Age after which local copies are pruned |
//! | `SNAPVAULT_POLL_INTERVAL_SECS`  | `5`     | Seconds between readiness polls      |
//! | `SNAPVAULT_POLL_TIMEOUT_SECS`   | `1500`  | Overall readiness wait budget        |
//! | `SNAPVAULT_WARMUP_SECS`         | `60`    | Initial window without polls         |
//! | `AWS_PROFILE` / `AWS_REGION`    | SDK default | Credential profile and region    |

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use snapvault_core::polling::WaitConfig;
use snapvault_core::retention::DEFAULT_RETENTION_DAYS;
use snapvault_core::settings::LifecycleSettings;
use snapvault_core::CoreError;

/// snapvault - keep a local copy of a shared RDS snapshot and restore from it
#[derive(Debug, Parser)]
#[command(name = "snapvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Named AWS profile
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable the progress bar during waits
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(flatten)]
    pub lifecycle: LifecycleArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Restore an instance from a fresh local copy of the newest shared snapshot
    Restore {
        /// Database the shared snapshots were taken from
        #[arg(long, env = "SNAPVAULT_SOURCE_DB")]
        source: String,

        /// Instance to create
        #[arg(long, env = "SNAPVAULT_TARGET_DB")]
        target: String,

        /// Instance whose subnet group and class are reused
        #[arg(long = "config-from", env = "SNAPVAULT_CONFIG_FROM_DB")]
        config_from: String,
    },

    /// Make sure the local copy tracks the newest shared snapshot
    Refresh {
        #[arg(long, env = "SNAPVAULT_SOURCE_DB")]
        source: String,
    },

    /// Delete local copies older than the retention window
    Prune {
        #[arg(long, env = "SNAPVAULT_SOURCE_DB")]
        source: String,
    },

    /// Delete a restored instance (no final snapshot)
    Destroy {
        #[arg(long, env = "SNAPVAULT_TARGET_DB")]
        target: String,
    },
}

#[derive(Debug, Args)]
pub struct LifecycleArgs {
    /// KMS key (ARN or alias) for local copies
    #[arg(long, env = "SNAPVAULT_KMS_KEY_ID", global = true)]
    pub kms_key_id: Option<String>,

    /// Days after which local copies are pruned
    #[arg(long, env = "SNAPVAULT_RETENTION_DAYS", default_value_t = DEFAULT_RETENTION_DAYS, global = true)]
    pub retention_days: i64,

    /// Seconds between readiness polls
    #[arg(long, env = "SNAPVAULT_POLL_INTERVAL_SECS", default_value_t = 5, global = true)]
    pub poll_interval_secs: u64,

    /// Overall readiness wait budget in seconds
    #[arg(long, env = "SNAPVAULT_POLL_TIMEOUT_SECS", default_value_t = 1500, global = true)]
    pub poll_timeout_secs: u64,

    /// Initial seconds during which no polls are made
    #[arg(long, env = "SNAPVAULT_WARMUP_SECS", default_value_t = 60, global = true)]
    pub warmup_secs: u64,

    /// Keep older copies after a fresh one is available
    #[arg(long, global = true)]
    pub keep_superseded: bool,
}

impl LifecycleArgs {
    pub fn to_settings(&self) -> Result<LifecycleSettings, CoreError> {
        let retention = chrono::Duration::try_days(self.retention_days).ok_or_else(|| {
            CoreError::Validation(format!(
                "Retention of {} days is out of range",
                self.retention_days
            ))
        })?;
        let settings = LifecycleSettings {
            retention,
            wait: WaitConfig {
                timeout: Duration::from_secs(self.poll_timeout_secs),
                poll_interval: Duration::from_secs(self.poll_interval_secs),
                warmup: Duration::from_secs(self.warmup_secs),
            },
            kms_key_id: self.kms_key_id.clone(),
            prune_superseded: !self.keep_superseded,
        };
        settings.validate()?;
        Ok(settings)
    }
}
