use chrono::{DateTime, Utc};
use pkg_constants::scaling::SCALED_OBJECT_LABEL;
use pkg_metrics::ScalingMetrics;
use pkg_types::job::{Job, JobCondition, JobSpec, JobStatus};
use pkg_types::pod::{Pod, RestartPolicy};
use pkg_types::scaledobject::ScaledObject;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::resources::ResourceManager;

/// In-flight work owned by one ScaledObject, recomputed fresh every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobAccounting {
    /// Owned Jobs without a terminal condition
    pub running_job_count: u32,
    /// Running Jobs none of whose Pods is Running or Succeeded yet
    pub pending_job_count: u32,
}

impl JobAccounting {
    /// Count running and pending jobs. `pods` may include pods of unrelated
    /// owners; only pods owned by a listed job are considered.
    pub fn from_jobs(jobs: &[Job], pods: &[Pod]) -> Self {
        let started: HashSet<&str> = pods
            .iter()
            .filter(|p| p.status.has_started())
            .filter_map(|p| p.owner_ref.as_deref())
            .collect();

        let mut accounting = JobAccounting::default();
        for job in jobs.iter().filter(|j| !j.status.condition.is_terminal()) {
            accounting.running_job_count += 1;
            if !started.contains(job.id.as_str()) {
                accounting.pending_job_count += 1;
            }
        }
        accounting
    }

    pub fn jobs_to_create(&self, scale_to: u32, max_replica_count: u32) -> u32 {
        jobs_to_create(
            scale_to,
            max_replica_count,
            self.running_job_count,
            self.pending_job_count,
        )
    }
}

/// `min(max(0, scale_to - pending), max(0, max_replica_count - running))`.
pub fn jobs_to_create(scale_to: u32, max_replica_count: u32, running: u32, pending: u32) -> u32 {
    let effective_max_scale = max_replica_count.saturating_sub(running);
    let effective_scale_to = scale_to.saturating_sub(pending);
    effective_scale_to.min(effective_max_scale)
}

/// What one orchestration pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub accounting: JobAccounting,
    pub planned: u32,
    pub created: u32,
    pub failed: u32,
    pub deleted: u32,
}

/// Turns a desired scale into a bounded number of new Jobs.
pub struct JobOrchestrator {
    resources: Arc<dyn ResourceManager>,
    metrics: ScalingMetrics,
    call_timeout: Duration,
}

impl JobOrchestrator {
    pub fn new(
        resources: Arc<dyn ResourceManager>,
        metrics: ScalingMetrics,
        call_timeout: Duration,
    ) -> Self {
        Self {
            resources,
            metrics,
            call_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("{} timed out after {:?}", what, self.call_timeout),
        }
    }

    /// List the jobs labeled for `so` and the matching accounting.
    pub async fn accounting(&self, so: &ScaledObject) -> anyhow::Result<(JobAccounting, Vec<Job>)> {
        let selector = HashMap::from([(SCALED_OBJECT_LABEL.to_string(), so.name.clone())]);
        let jobs = self
            .bounded("listing jobs", self.resources.list_jobs(&so.namespace, &selector))
            .await?;
        let pods = self
            .bounded("listing pods", self.resources.list_pods(&so.namespace))
            .await?;
        Ok((JobAccounting::from_jobs(&jobs, &pods), jobs))
    }

    /// Create the jobs needed to reach `scale_to` without exceeding the
    /// object's maximum, then prune finished-job history.
    ///
    /// Listing failures abort the pass. Each create and delete is
    /// independent: a failure is logged and the rest of the batch proceeds.
    pub async fn reconcile(
        &self,
        so: &ScaledObject,
        template: &JobSpec,
        scale_to: u32,
    ) -> anyhow::Result<JobReport> {
        let object = so.qualified_name();
        let (accounting, jobs) = self.accounting(so).await?;
        let planned = accounting.jobs_to_create(scale_to, so.spec.max_replica_count);

        let mut report = JobReport {
            accounting,
            planned,
            ..Default::default()
        };
        debug!(
            scaledobject = %object,
            scale_to,
            running = accounting.running_job_count,
            pending = accounting.pending_job_count,
            planned,
            "job accounting"
        );

        let now = Utc::now();
        for _ in 0..planned {
            let job = build_job(so, template, now);
            match self.bounded("creating job", self.resources.create_job(&job)).await {
                Ok(()) => {
                    report.created += 1;
                    debug!(scaledobject = %object, job = %job.name, "created job");
                }
                Err(e) => {
                    report.failed += 1;
                    self.metrics.job_create_error(&object);
                    warn!(scaledobject = %object, job = %job.name, error = %e, "job create failed");
                }
            }
        }
        if report.created > 0 {
            self.metrics.jobs_created(&object, report.created);
            info!(
                scaledobject = %object,
                created = report.created,
                failed = report.failed,
                running = accounting.running_job_count,
                pending = accounting.pending_job_count,
                "scaled job"
            );
        }

        report.deleted = self.prune_history(so, &jobs).await;
        Ok(report)
    }

    /// Delete the oldest finished jobs beyond the per-outcome history limits.
    /// Non-terminal jobs are never touched.
    async fn prune_history(&self, so: &ScaledObject, jobs: &[Job]) -> u32 {
        let mut doomed = finished_beyond_limit(
            jobs,
            JobCondition::Complete,
            so.spec.successful_jobs_history_limit,
        );
        doomed.extend(finished_beyond_limit(
            jobs,
            JobCondition::Failed,
            so.spec.failed_jobs_history_limit,
        ));

        let mut deleted = 0;
        for job in doomed {
            match self.bounded("deleting job", self.resources.delete_job(job)).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(
                    scaledobject = %so.qualified_name(),
                    job = %job.name,
                    error = %e,
                    "failed to prune finished job"
                ),
            }
        }
        deleted
    }
}

fn finished_at(job: &Job) -> DateTime<Utc> {
    job.status.completion_time.unwrap_or(job.created_at)
}

fn finished_beyond_limit(jobs: &[Job], condition: JobCondition, limit: u32) -> Vec<&Job> {
    let mut finished: Vec<&Job> = jobs
        .iter()
        .filter(|j| j.status.condition == condition)
        .collect();
    // Newest first; everything past `limit` goes.
    finished.sort_by_key(|j| std::cmp::Reverse(finished_at(j)));
    finished.into_iter().skip(limit as usize).collect()
}

/// Build one Job from the template. The template is cloned and only the
/// clone is mutated.
pub fn build_job(so: &ScaledObject, template: &JobSpec, now: DateTime<Utc>) -> Job {
    let id = Uuid::new_v4().to_string();
    let mut spec = template.clone();
    if spec.template.restart_policy.is_none() {
        spec.template.restart_policy = Some(RestartPolicy::OnFailure);
    }
    Job {
        name: format!("{}-{}", so.name, &id[..8]),
        id,
        namespace: so.namespace.clone(),
        labels: HashMap::from([(SCALED_OBJECT_LABEL.to_string(), so.name.clone())]),
        spec,
        status: JobStatus::default(),
        owner_ref: Some(so.id.clone()),
        created_at: now,
    }
}
