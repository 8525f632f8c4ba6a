use std::path::PathBuf;

use chrono::Duration;
use clap::Parser;

use crate::policy::RetentionPolicy;
use crate::{Error, Result};

/// Command-line surface of the reaper process.
#[derive(Debug, Parser)]
#[command(name = "job-reaper", about = "Reaps finished Kubernetes Jobs and alerts on their outcome")]
pub struct Args {
    /// Path to the alert sink configuration
    #[arg(long, default_value = "./config.yaml")]
    pub config: PathBuf,

    /// Minimum age in seconds before a completed job can be deleted
    #[arg(long = "keep-completed", default_value_t = 0)]
    pub keep_completed: u64,

    /// Threshold of allowable failures for a job; negative disables the check
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub failures: i32,

    /// Seconds to wait between looking for jobs to reap
    #[arg(long, default_value_t = 30)]
    pub interval: u64,

    /// Log level - trace, debug, info, warn, error
    #[arg(long, default_value = "info")]
    pub log: String,

    /// Number of reaper workers to run
    #[arg(long, default_value_t = 2)]
    pub reapers: usize,

    /// Multiplier for queue capacity compared to reaper count
    #[arg(long, default_value_t = 1)]
    pub buffer: usize,

    /// Ignore jobs owned by other objects (e.g. CronJobs)
    #[arg(long = "ignore-owned", default_value_t = false)]
    pub ignore_owned: bool,

    /// Bind address for the health and metrics endpoints
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: String,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.reapers < 1 {
            return Err(Error::Config(
                "reaper count must be greater than 0".to_string(),
            ));
        }
        if self.buffer < 1 {
            return Err(Error::Config("buffer ratio must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_failures: self.failures,
            keep_completed: Duration::seconds(self.keep_completed as i64),
            ignore_owned: self.ignore_owned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["job-reaper"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let args = args(&[]);
        assert_eq!(args.interval, 30);
        assert_eq!(args.reapers, 2);
        assert_eq!(args.buffer, 1);
        assert_eq!(args.failures, -1);
        assert!(!args.ignore_owned);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn pool_sizing_below_minimum_is_rejected() {
        assert!(args(&["--reapers", "0"]).validate().is_err());
        assert!(args(&["--buffer", "0"]).validate().is_err());
    }

    #[test]
    fn retention_policy_carries_the_flags() {
        let policy = args(&["--keep-completed", "60", "--failures", "3", "--ignore-owned"])
            .retention_policy();
        assert_eq!(policy.max_failures, 3);
        assert_eq!(policy.keep_completed, Duration::seconds(60));
        assert!(policy.ignore_owned);
    }
}
