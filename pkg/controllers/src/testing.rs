//! Hand-written fakes for the scaler and resource-manager seams.

use anyhow::bail;
use async_trait::async_trait;
use chrono::Utc;
use pkg_scalers::{Scaler, ScalerError, ScalerRegistry, ScalerResult};
use pkg_types::deployment::{Deployment, DeploymentSpec, DeploymentStatus};
use pkg_types::job::{Job, JobCondition, JobSpec};
use pkg_types::metrics::{ExternalMetricValue, MetricReading};
use pkg_types::pod::{ContainerSpec, Pod, PodSpec, PodStatus, ResourceRequirements};
use pkg_types::scaledobject::{
    ScaleTarget, ScaledObject, ScaledObjectSpec, ScaledObjectStatus, TriggerSpec,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::resources::ResourceManager;

#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Reading { value: f64, target: f64, active: bool },
    Fail(String),
}

/// Scaler returning a scripted outcome that tests may change between polls.
#[derive(Clone)]
pub struct FakeScaler {
    outcome: Arc<Mutex<FakeOutcome>>,
    delay: Option<Duration>,
}

impl FakeScaler {
    pub fn reading(value: f64, target: f64, active: bool) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(FakeOutcome::Reading {
                value,
                target,
                active,
            })),
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(FakeOutcome::Fail(message.to_string()))),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set(&self, outcome: FakeOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl Scaler for FakeScaler {
    async fn query(&self) -> ScalerResult<(MetricReading, bool)> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            FakeOutcome::Reading {
                value,
                target,
                active,
            } => Ok((MetricReading::new("s0-fake", value, target), active)),
            FakeOutcome::Fail(message) => Err(anyhow::anyhow!(message).into()),
        }
    }
}

#[derive(Default)]
struct Inner {
    jobs: Vec<Job>,
    pods: Vec<Pod>,
    deployments: Vec<Deployment>,
    published: Vec<ExternalMetricValue>,
    statuses: Vec<ScaledObjectStatus>,
    create_calls: usize,
    failing_creates: HashSet<usize>,
    mutations: usize,
}

/// In-memory [`ResourceManager`] that records every call.
#[derive(Clone, Default)]
pub struct FakeResources {
    inner: Arc<Mutex<Inner>>,
}

impl FakeResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th create_job call (0-based, counted across the fake's
    /// lifetime) fail.
    pub fn fail_create_call(&self, n: usize) {
        self.inner.lock().unwrap().failing_creates.insert(n);
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.inner.lock().unwrap().jobs.clone()
    }

    pub fn published(&self) -> Vec<ExternalMetricValue> {
        self.inner.lock().unwrap().published.clone()
    }

    pub fn statuses(&self) -> Vec<ScaledObjectStatus> {
        self.inner.lock().unwrap().statuses.clone()
    }

    /// Count of calls that changed a job, deployment or external metric.
    pub fn mutations(&self) -> usize {
        self.inner.lock().unwrap().mutations
    }

    pub fn add_job(&self, job: Job) {
        self.inner.lock().unwrap().jobs.push(job);
    }

    pub fn set_job_condition(&self, job_id: &str, condition: JobCondition) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == job_id) {
            job.status.condition = condition;
            job.status.completion_time = Some(Utc::now());
        }
    }

    pub fn add_pod_for_job(&self, job: &Job, status: PodStatus) {
        let pod = Pod {
            id: format!("{}-pod", job.id),
            name: format!("{}-pod", job.name),
            namespace: job.namespace.clone(),
            spec: job.spec.template.clone(),
            status,
            node_name: None,
            labels: HashMap::new(),
            owner_ref: Some(job.id.clone()),
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().pods.push(pod);
    }

    pub fn add_deployment(&self, namespace: &str, name: &str, replicas: u32) {
        let deployment = Deployment {
            id: format!("{name}-id"),
            name: name.to_string(),
            namespace: namespace.to_string(),
            spec: DeploymentSpec {
                replicas,
                template: test_pod_spec(),
                selector: HashMap::new(),
            },
            status: DeploymentStatus::default(),
            generation: 1,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().deployments.push(deployment);
    }

    pub fn deployment_replicas(&self, name: &str) -> Option<u32> {
        self.inner
            .lock()
            .unwrap()
            .deployments
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.spec.replicas)
    }
}

#[async_trait]
impl ResourceManager for FakeResources {
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<Job>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .jobs
            .iter()
            .filter(|j| j.namespace == namespace && j.matches_selector(selector))
            .cloned()
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> anyhow::Result<Vec<Pod>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .pods
            .iter()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn create_job(&self, job: &Job) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let call = inner.create_calls;
        inner.create_calls += 1;
        if inner.failing_creates.contains(&call) {
            bail!("admission webhook rejected job {}", job.name);
        }
        inner.jobs.push(job.clone());
        inner.mutations += 1;
        Ok(())
    }

    async fn delete_job(&self, job: &Job) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.jobs.retain(|j| j.id != job.id);
        inner.mutations += 1;
        Ok(())
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Option<Deployment>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .deployments
            .iter()
            .find(|d| d.namespace == namespace && d.name == name)
            .cloned())
    }

    async fn update_deployment(&self, deployment: &Deployment) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.deployments.iter_mut().find(|d| d.id == deployment.id) {
            *existing = deployment.clone();
        }
        inner.mutations += 1;
        Ok(())
    }

    async fn publish_external_metric(&self, value: &ExternalMetricValue) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.published.push(value.clone());
        inner.mutations += 1;
        Ok(())
    }

    async fn update_status(&self, so: &ScaledObject) -> anyhow::Result<()> {
        self.inner.lock().unwrap().statuses.push(so.status.clone());
        Ok(())
    }
}

pub fn test_pod_spec() -> PodSpec {
    PodSpec {
        containers: vec![ContainerSpec {
            name: "consumer".to_string(),
            image: "registry.local/consumer:1.0".to_string(),
            command: vec![],
            args: vec![],
            env: HashMap::new(),
            resources: ResourceRequirements::default(),
        }],
        restart_policy: None,
        node_affinity: HashMap::new(),
    }
}

/// Trigger type served by [`fake_registry`].
pub const FAKE_TRIGGER: &str = "fake";

/// Registry whose `fake` trigger type hands out the scaler named by the
/// trigger's `scaler` metadata key. Clones share their scripted outcome, so
/// tests keep a handle and change readings between polls.
pub fn fake_registry(scalers: &[(&str, FakeScaler)]) -> ScalerRegistry {
    let scalers: HashMap<String, FakeScaler> = scalers
        .iter()
        .map(|(id, s)| (id.to_string(), s.clone()))
        .collect();
    let mut registry = ScalerRegistry::new();
    registry.register(FAKE_TRIGGER, move |cfg| {
        let id = cfg.trigger.metadata.get("scaler").cloned().unwrap_or_default();
        match scalers.get(&id) {
            Some(scaler) => Ok(Box::new(scaler.clone()) as Box<dyn Scaler>),
            None => Err(ScalerError::MissingMetadata {
                trigger: cfg.trigger_name(),
                key: "scaler".to_string(),
            }),
        }
    });
    registry
}

pub fn fake_trigger(scaler: &str) -> TriggerSpec {
    TriggerSpec {
        trigger_type: FAKE_TRIGGER.to_string(),
        name: Some(scaler.to_string()),
        metadata: HashMap::from([("scaler".to_string(), scaler.to_string())]),
        ..Default::default()
    }
}

pub fn test_job_spec() -> JobSpec {
    JobSpec {
        template: test_pod_spec(),
        completions: 1,
        parallelism: 1,
        backoff_limit: 6,
    }
}

pub fn test_scaled_object(target: ScaleTarget, min: u32, max: u32) -> ScaledObject {
    ScaledObject {
        id: "so-1".to_string(),
        name: "consumer".to_string(),
        namespace: "default".to_string(),
        spec: ScaledObjectSpec {
            target,
            min_replica_count: min,
            max_replica_count: max,
            polling_interval: 1,
            cooldown_period: 60,
            triggers: vec![fake_trigger("queue")],
            successful_jobs_history_limit: 100,
            failed_jobs_history_limit: 100,
        },
        status: ScaledObjectStatus::default(),
        generation: 1,
        created_at: Utc::now(),
    }
}
