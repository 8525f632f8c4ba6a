//! The reaping engine: one cycle enumerates every namespace, filters its Jobs
//! through the retention policy, and feeds the eligible ones to a bounded pool
//! of workers. Each worker derives the outcome, fans it out to the alert
//! sinks, then hands the deletion off to a detached task so the next queued
//! job is never stuck behind deletion latency.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::kubernetes::{is_status_error, job_pod_selector, ClusterApi};
use crate::metrics;
use crate::outcome::{self, Derivation, OutcomeRecord};
use crate::policy::{should_reap, RetentionPolicy};
use crate::shutdown::Shutdown;
use crate::sinks::AlertSink;
use crate::{Error, Result};

type SharedQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

#[derive(Clone)]
pub struct Reaper {
    api: Arc<dyn ClusterApi>,
    sinks: Arc<Vec<Box<dyn AlertSink>>>,
    policy: RetentionPolicy,
    reapers: usize,
    buffer_depth: usize,
    shutdown: Arc<Shutdown>,
}

impl Reaper {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        sinks: Vec<Box<dyn AlertSink>>,
        policy: RetentionPolicy,
        reapers: usize,
        buffer_depth: usize,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            api,
            sinks: Arc::new(sinks),
            policy,
            reapers,
            buffer_depth,
            shutdown,
        }
    }

    /// Runs one full pass over the cluster. Returns once every worker has
    /// drained the queue; detached deletion tasks are not awaited.
    pub async fn run_cycle(&self) -> Result<()> {
        let namespaces = self.api.list_namespaces().await?;

        let capacity = self.reapers * self.buffer_depth;
        let (queue_tx, queue_rx) = mpsc::channel::<Job>(capacity);
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        info!(
            "Spawning {} reapers with buffer depth of {}",
            self.reapers, capacity
        );
        let workers: Vec<_> = (0..self.reapers)
            .map(|_| {
                let worker = self.clone();
                let queue = Arc::clone(&queue_rx);
                tokio::spawn(async move { worker.drain_queue(queue).await })
            })
            .collect();
        // Workers now hold the only receiver handles; once they all exit the
        // producer's send fails instead of blocking on a full queue.
        drop(queue_rx);

        let mut producer_result = Ok(());
        for namespace in &namespaces {
            debug!(namespace = %namespace, "Processing namespace");
            if let Err(err) = self.enqueue_namespace(namespace, &queue_tx).await {
                producer_result = Err(err);
                break;
            }
            if self.shutdown.is_requested() {
                break;
            }
        }
        drop(queue_tx);

        let joined = join_all(workers).await;
        producer_result?;
        for worker_result in joined {
            match worker_result {
                Ok(result) => result?,
                Err(err) => {
                    return Err(Error::Internal(format!("reap worker panicked: {err}")))
                }
            }
        }
        Ok(())
    }

    /// Lists a namespace's Jobs sorted by completion time and pushes the
    /// policy-eligible ones into the queue, blocking when it is full.
    async fn enqueue_namespace(&self, namespace: &str, queue: &mpsc::Sender<Job>) -> Result<()> {
        let mut jobs = self.api.list_jobs(namespace).await?;
        sort_by_completion(&mut jobs);

        let now = Utc::now();
        for job in jobs {
            if self.shutdown.is_requested() {
                return Ok(());
            }
            if should_reap(&job, &self.policy, now) {
                if queue.send(job).await.is_err() {
                    // Every worker has exited
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn drain_queue(self, queue: SharedQueue) -> Result<()> {
        loop {
            let job = { queue.lock().await.recv().await };
            let Some(job) = job else { break };
            self.reap(job).await?;

            // Polled only between jobs; an in-flight job is never aborted
            if self.shutdown.is_requested() {
                break;
            }
        }
        Ok(())
    }

    async fn reap(&self, job: Job) -> Result<()> {
        let job_name = job.metadata.name.clone().unwrap_or_default();
        let namespace = job.metadata.namespace.clone().unwrap_or_default();

        let selector = job_pod_selector(&job);
        let pods = match self.api.list_pods(&namespace, &selector).await {
            Ok(pods) => pods,
            Err(Error::Api(err)) if is_status_error(&err) => {
                warn!(
                    job = %job_name,
                    namespace = %namespace,
                    error = %err,
                    "Could not fetch pods for job. Skipping for now."
                );
                metrics::SKIPPED_JOBS_TOTAL.inc();
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let pod = outcome::oldest_pod(&pods);
        match outcome::derive_outcome(&job, pod, Utc::now()) {
            Derivation::Record(record) => {
                self.dispatch_alerts(&record).await;
                metrics::REAPED_JOBS_TOTAL.inc();
                self.spawn_deletion(job_name, namespace, pods);
            }
            Derivation::AnomalousContainerState => {
                error!(
                    job = %job_name,
                    namespace = %namespace,
                    "Unexpected null for container state; job left unreaped this cycle"
                );
                error!(?job);
                if let Some(pod_name) = pod.and_then(|p| p.metadata.name.as_deref()) {
                    match self.api.list_pod_events(&namespace, pod_name).await {
                        Ok(events) => error!(pod = %pod_name, ?events),
                        Err(err) => {
                            warn!(pod = %pod_name, error = %err, "could not fetch pod events")
                        }
                    }
                }
                metrics::SKIPPED_JOBS_TOTAL.inc();
            }
        }
        Ok(())
    }

    /// Sends the record to every sink in configured order. A sink failure is
    /// logged and never stops the fan-out or the deletion that follows.
    async fn dispatch_alerts(&self, record: &OutcomeRecord) {
        for sink in self.sinks.iter() {
            if let Err(err) = sink.send(record).await {
                metrics::SINK_ERRORS_TOTAL.inc();
                error!(sink = sink.name(), error = %err, "alert sink send failed");
            }
        }
    }

    /// Deletes the Job and its pods on a detached task. The worker moves on
    /// to the next queued job without waiting; each deletion is best-effort.
    fn spawn_deletion(&self, job_name: String, namespace: String, pods: Vec<Pod>) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(err) = api.delete_job(&namespace, &job_name).await {
                metrics::DELETE_ERRORS_TOTAL.inc();
                error!(job = %job_name, error = %err, "failed to delete job");
            }

            debug!(job = %job_name, "Deleting pods");
            for pod in &pods {
                let Some(pod_name) = pod.metadata.name.as_deref() else {
                    continue;
                };
                if let Err(err) = api.delete_pod(&namespace, pod_name).await {
                    metrics::DELETE_ERRORS_TOTAL.inc();
                    error!(pod = %pod_name, error = %err, "failed to delete pod");
                }
            }
            debug!(job = %job_name, "Done deleting pods");
        });
    }
}

/// Orders Jobs by completion time; Jobs that never completed sort last.
pub fn sort_by_completion(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| match (completion_time(a), completion_time(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    });
}

fn completion_time(job: &Job) -> Option<DateTime<Utc>> {
    job.status
        .as_ref()
        .and_then(|status| status.completion_time.as_ref())
        .map(|t| t.0)
}
