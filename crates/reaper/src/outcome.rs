//! Outcome derivation
//!
//! Reconstructs "what happened" to a finished Job from the Job itself and the
//! pods it spawned, producing the record handed to the alert sinks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// Exit code reported when the Job carries conditions but never completed
/// through an observed `Complete` condition.
pub const EXIT_CODE_POD_MISSING: i32 = 998;

/// Exit code reported when neither container state nor Job conditions are
/// available.
pub const EXIT_CODE_UNKNOWN: i32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Error,
}

/// Normalized summary of a reaped Job's terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub name: String,
    pub message: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub exit_code: i32,
    pub namespace: String,
    pub annotations: BTreeMap<String, String>,
    pub level: AlertLevel,
}

/// Result of outcome derivation for a single Job.
#[derive(Debug)]
pub enum Derivation {
    Record(OutcomeRecord),
    /// A container status was present but reported no terminated state. The
    /// Job is skipped for this cycle: no alert, no deletion.
    AnomalousContainerState,
}

/// The pod with the earliest creation timestamp, if any.
pub fn oldest_pod(pods: &[Pod]) -> Option<&Pod> {
    pods.iter()
        .filter(|pod| pod.metadata.creation_timestamp.is_some())
        .min_by_key(|pod| pod.metadata.creation_timestamp.as_ref().map(|t| t.0))
}

/// Derives the outcome record for a Job selected for reaping.
///
/// Precedence: terminated container state wins over Job conditions, which win
/// over the unfinished fallback.
pub fn derive_outcome(job: &Job, pod: Option<&Pod>, now: DateTime<Utc>) -> Derivation {
    let mut name = job.metadata.name.clone().unwrap_or_default();
    let namespace = job.metadata.namespace.clone().unwrap_or_default();
    let annotations = job.metadata.annotations.clone().unwrap_or_default();

    let mut status = "Unknown".to_string();
    let mut message = String::new();
    let exit_code;
    let mut start_time = None;
    let end_time;

    if let Some(pod) = pod {
        // A pod scheduled by name carries the original name under `run`
        if let Some(scheduled_name) = pod.metadata.labels.as_ref().and_then(|l| l.get("run")) {
            name = scheduled_name.clone();
        }
        if let Some(phase) = pod.status.as_ref().and_then(|s| s.phase.as_ref()) {
            if !phase.is_empty() {
                status = phase.clone();
            }
        }
    }

    let container_status = pod
        .and_then(|p| p.status.as_ref())
        .and_then(|s| s.container_statuses.as_ref())
        .and_then(|statuses| statuses.first());
    let conditions = job
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .filter(|conds| !conds.is_empty());

    if let Some(container) = container_status {
        // Container has exited
        let Some(terminated) = container.state.as_ref().and_then(|s| s.terminated.as_ref())
        else {
            return Derivation::AnomalousContainerState;
        };
        message = terminated.reason.clone().unwrap_or_default();
        exit_code = terminated.exit_code;
        start_time = terminated.started_at.as_ref().map(|t| t.0);
        end_time = terminated.finished_at.as_ref().map(|t| t.0);
    } else if let Some(conditions) = conditions {
        let condition = &conditions[0];
        message = format!(
            "Pod Missing: {} - {}",
            condition.reason.as_deref().unwrap_or_default(),
            condition.message.as_deref().unwrap_or_default()
        );
        if condition.type_ == "Complete" {
            exit_code = 0;
            status = "Succeeded".to_string();
        } else {
            exit_code = EXIT_CODE_POD_MISSING;
        }
        start_time = job
            .status
            .as_ref()
            .and_then(|s| s.start_time.as_ref())
            .map(|t| t.0);
        end_time = condition.last_transition_time.as_ref().map(|t| t.0);
    } else {
        // Unfinished containers, or the pods vanished without conditions
        exit_code = EXIT_CODE_UNKNOWN;
        end_time = Some(now);
    }

    let level = if exit_code == 0 {
        AlertLevel::Info
    } else {
        AlertLevel::Error
    };

    Derivation::Record(OutcomeRecord {
        name,
        message,
        status,
        start_time,
        end_time,
        exit_code,
        namespace,
        annotations,
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use k8s_openapi::api::batch::v1::{JobCondition, JobStatus};
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateTerminated, ContainerStatus, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn job(name: &str) -> Job {
        Job {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn terminated_pod(reason: &str, exit_code: i32) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some("Failed".to_string()),
                container_statuses: Some(vec![ContainerStatus {
                    state: Some(ContainerState {
                        terminated: Some(ContainerStateTerminated {
                            reason: Some(reason.to_string()),
                            exit_code,
                            started_at: Some(Time(Utc::now() - Duration::minutes(5))),
                            finished_at: Some(Time(Utc::now())),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn record(derivation: Derivation) -> OutcomeRecord {
        match derivation {
            Derivation::Record(record) => record,
            Derivation::AnomalousContainerState => panic!("expected a record"),
        }
    }

    #[test]
    fn terminated_container_fills_message_exit_code_and_times() {
        let pod = terminated_pod("OOMKilled", 137);
        let rec = record(derive_outcome(&job("batch-1"), Some(&pod), Utc::now()));
        assert_eq!(rec.message, "OOMKilled");
        assert_eq!(rec.exit_code, 137);
        assert_eq!(rec.status, "Failed");
        assert_eq!(rec.level, AlertLevel::Error);
        assert!(rec.start_time.is_some());
        assert!(rec.end_time.is_some());
    }

    #[test]
    fn clean_exit_is_informational() {
        let pod = terminated_pod("Completed", 0);
        let rec = record(derive_outcome(&job("batch-1"), Some(&pod), Utc::now()));
        assert_eq!(rec.exit_code, 0);
        assert_eq!(rec.level, AlertLevel::Info);
    }

    #[test]
    fn container_without_terminated_state_is_anomalous() {
        let pod = Pod {
            status: Some(PodStatus {
                container_statuses: Some(vec![ContainerStatus::default()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        // Conditions are present but must not be consulted: terminated data wins
        let mut job = job("batch-1");
        job.status = Some(JobStatus {
            conditions: Some(vec![JobCondition {
                type_: "Complete".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        });
        assert!(matches!(
            derive_outcome(&job, Some(&pod), Utc::now()),
            Derivation::AnomalousContainerState
        ));
    }

    #[test]
    fn missing_pod_with_complete_condition_succeeds() {
        let transition = Utc::now() - Duration::minutes(1);
        let mut job = job("batch-1");
        job.status = Some(JobStatus {
            start_time: Some(Time(Utc::now() - Duration::minutes(10))),
            conditions: Some(vec![JobCondition {
                type_: "Complete".to_string(),
                reason: Some("JobFinished".to_string()),
                message: Some("all pods succeeded".to_string()),
                last_transition_time: Some(Time(transition)),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let rec = record(derive_outcome(&job, None, Utc::now()));
        assert_eq!(rec.exit_code, 0);
        assert_eq!(rec.status, "Succeeded");
        assert_eq!(rec.level, AlertLevel::Info);
        assert_eq!(rec.message, "Pod Missing: JobFinished - all pods succeeded");
        assert_eq!(rec.end_time, Some(transition));
    }

    #[test]
    fn missing_pod_with_failed_condition_uses_the_998_sentinel() {
        let mut job = job("batch-1");
        job.status = Some(JobStatus {
            conditions: Some(vec![JobCondition {
                type_: "Failed".to_string(),
                reason: Some("BackoffLimitExceeded".to_string()),
                message: Some("too many retries".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        });
        let rec = record(derive_outcome(&job, None, Utc::now()));
        assert_eq!(rec.exit_code, EXIT_CODE_POD_MISSING);
        assert_eq!(rec.level, AlertLevel::Error);
    }

    #[test]
    fn no_data_at_all_uses_the_999_sentinel() {
        let now = Utc::now();
        let rec = record(derive_outcome(&job("batch-1"), None, now));
        assert_eq!(rec.exit_code, EXIT_CODE_UNKNOWN);
        assert_eq!(rec.status, "Unknown");
        assert_eq!(rec.message, "");
        assert_eq!(rec.end_time, Some(now));
        assert_eq!(rec.level, AlertLevel::Error);
    }

    #[test]
    fn run_label_overrides_the_record_name() {
        let mut pod = terminated_pod("Completed", 0);
        pod.metadata.labels = Some(
            [("run".to_string(), "nightly-export".to_string())]
                .into_iter()
                .collect(),
        );
        let rec = record(derive_outcome(&job("nightly-export-1234"), Some(&pod), Utc::now()));
        assert_eq!(rec.name, "nightly-export");
    }

    #[test]
    fn oldest_pod_picks_the_earliest_creation_timestamp() {
        let pod_at = |secs: i64| Pod {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(format!("pod-{secs}")),
                creation_timestamp: Some(Time(Utc::now() - Duration::seconds(secs))),
                ..Default::default()
            },
            ..Default::default()
        };
        let pods = vec![pod_at(10), pod_at(300), pod_at(60)];
        let oldest = oldest_pod(&pods).unwrap();
        assert_eq!(oldest.metadata.name.as_deref(), Some("pod-300"));
        assert!(oldest_pod(&[]).is_none());
    }
}
