use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::batch::v1::Job;

/// Retention rules applied to every Job in the cluster once per cycle.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Threshold of allowable failures. Negative disables the check.
    pub max_failures: i32,
    /// Minimum age since completion before a completed Job may be deleted.
    pub keep_completed: Duration,
    /// Skip Jobs owned by other objects (e.g. CronJobs).
    pub ignore_owned: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_failures: -1,
            keep_completed: Duration::zero(),
            ignore_owned: false,
        }
    }
}

/// Decides whether a Job is eligible for reaping. Pure; rule order matters.
pub fn should_reap(job: &Job, policy: &RetentionPolicy, now: DateTime<Utc>) -> bool {
    let owned = job
        .metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| !refs.is_empty());
    if policy.ignore_owned && owned {
        return false;
    }

    let status = job.status.as_ref();
    let failures = status.and_then(|s| s.failed).unwrap_or(0);

    // Always reap once the failure count exceeds the maximum
    if policy.max_failures >= 0 && failures > policy.max_failures {
        return true;
    }

    // Don't reap anything that hasn't met its completion count
    let successes = status.and_then(|s| s.succeeded).unwrap_or(0);
    if successes < required_completions(job) {
        return false;
    }

    // Don't reap completed jobs that aren't old enough
    if let Some(completed) = status.and_then(|s| s.completion_time.as_ref()) {
        if now - completed.0 < policy.keep_completed {
            return false;
        }
    }

    true
}

/// The Job's configured completion count, defaulting to 1 when unset.
pub fn required_completions(job: &Job) -> i32 {
    job.spec.as_ref().and_then(|s| s.completions).unwrap_or(1)
}
