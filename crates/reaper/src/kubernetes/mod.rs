pub mod client;

pub use client::KubeClusterApi;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Event, Pod};

use crate::Result;

/// Cluster operations consumed by the reaper. Implementations must be safe to
/// share across workers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>>;
    async fn list_jobs(&self, namespace: &str) -> Result<Vec<Job>>;
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>>;
    /// Events for a pod, fetched for diagnostics only.
    async fn list_pod_events(&self, namespace: &str, pod_name: &str) -> Result<Vec<Event>>;
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Label selector matching the pods a Job spawned, via the controller identity
/// the Job's selector carries.
pub fn job_pod_selector(job: &Job) -> String {
    let controller_uid = job
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.as_ref())
        .and_then(|selector| selector.match_labels.as_ref())
        .and_then(|labels| labels.get("controller-uid"))
        .map(String::as_str)
        .unwrap_or_default();
    format!("controller-uid={controller_uid}")
}

/// Whether a Kubernetes error belongs to the recoverable status-error class
/// (e.g. not-found). Anything else indicates a broken connection to the API
/// server and is treated as fatal.
pub fn is_status_error(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(_))
}
