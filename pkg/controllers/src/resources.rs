//! The resource-manager seam: every side effect the engine has on the
//! cluster goes through [`ResourceManager`].

use anyhow::Context;
use async_trait::async_trait;
use pkg_constants::state::{
    DEPLOYMENTS_PREFIX, EXTERNAL_METRICS_PREFIX, JOBS_PREFIX, PODS_PREFIX,
    SCALED_OBJECT_STATUS_PREFIX, SCALED_OBJECTS_PREFIX,
};
use pkg_state::client::StateStore;
use pkg_types::deployment::Deployment;
use pkg_types::job::Job;
use pkg_types::metrics::ExternalMetricValue;
use pkg_types::pod::Pod;
use pkg_types::scaledobject::ScaledObject;
use std::collections::HashMap;
use tracing::debug;

/// Side-effecting calls the engine makes. Each call is attempted at most once
/// per cycle; the next poll recomputes from fresh state.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Jobs in `namespace` whose labels contain every pair in `selector`.
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<Job>>;

    async fn list_pods(&self, namespace: &str) -> anyhow::Result<Vec<Pod>>;

    async fn create_job(&self, job: &Job) -> anyhow::Result<()>;

    async fn delete_job(&self, job: &Job) -> anyhow::Result<()>;

    async fn get_deployment(&self, namespace: &str, name: &str)
    -> anyhow::Result<Option<Deployment>>;

    async fn update_deployment(&self, deployment: &Deployment) -> anyhow::Result<()>;

    /// Publish the value the HPA collaborator scales a Deployment on.
    async fn publish_external_metric(&self, value: &ExternalMetricValue) -> anyhow::Result<()>;

    /// Persist `so.status` for the generation it was computed from. The
    /// object's spec document is never written.
    async fn update_status(&self, so: &ScaledObject) -> anyhow::Result<()>;
}

pub fn scaled_object_key(so: &ScaledObject) -> String {
    format!("{}{}/{}", SCALED_OBJECTS_PREFIX, so.namespace, so.id)
}

/// Key of the status document of the ScaledObject stored under
/// `/registry/scaledobjects/<namespace>/<id>`.
pub fn scaled_object_status_key(namespace: &str, id: &str) -> String {
    format!("{}{}/{}", SCALED_OBJECT_STATUS_PREFIX, namespace, id)
}

fn job_key(job: &Job) -> String {
    format!("{}{}/{}", JOBS_PREFIX, job.namespace, job.id)
}

/// [`ResourceManager`] over the SlateDB state store.
#[derive(Clone)]
pub struct StoreResourceManager {
    store: StateStore,
}

impl StoreResourceManager {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceManager for StoreResourceManager {
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<Job>> {
        let prefix = format!("{}{}/", JOBS_PREFIX, namespace);
        let jobs: Vec<(String, Job)> = self
            .store
            .list_json(&prefix)
            .await
            .with_context(|| format!("listing jobs in {}", namespace))?;
        Ok(jobs
            .into_iter()
            .map(|(_, job)| job)
            .filter(|job| job.matches_selector(selector))
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> anyhow::Result<Vec<Pod>> {
        let prefix = format!("{}{}/", PODS_PREFIX, namespace);
        let pods: Vec<(String, Pod)> = self
            .store
            .list_json(&prefix)
            .await
            .with_context(|| format!("listing pods in {}", namespace))?;
        Ok(pods.into_iter().map(|(_, pod)| pod).collect())
    }

    async fn create_job(&self, job: &Job) -> anyhow::Result<()> {
        let key = job_key(job);
        if self.store.get(&key).await?.is_some() {
            anyhow::bail!("job {} already exists", job.id);
        }
        self.store
            .put_json(&key, job)
            .await
            .with_context(|| format!("creating job {}/{}", job.namespace, job.name))
    }

    async fn delete_job(&self, job: &Job) -> anyhow::Result<()> {
        self.store
            .delete(&job_key(job))
            .await
            .with_context(|| format!("deleting job {}/{}", job.namespace, job.name))
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Option<Deployment>> {
        let prefix = format!("{}{}/", DEPLOYMENTS_PREFIX, namespace);
        let deployments: Vec<(String, Deployment)> = self.store.list_json(&prefix).await?;
        Ok(deployments
            .into_iter()
            .map(|(_, d)| d)
            .find(|d| d.name == name))
    }

    async fn update_deployment(&self, deployment: &Deployment) -> anyhow::Result<()> {
        let key = format!(
            "{}{}/{}",
            DEPLOYMENTS_PREFIX, deployment.namespace, deployment.id
        );
        self.store
            .put_json(&key, deployment)
            .await
            .with_context(|| format!("updating deployment {}", deployment.name))
    }

    async fn publish_external_metric(&self, value: &ExternalMetricValue) -> anyhow::Result<()> {
        let key = format!(
            "{}{}/{}",
            EXTERNAL_METRICS_PREFIX, value.namespace, value.scaled_object
        );
        self.store.put_json(&key, value).await
    }

    async fn update_status(&self, so: &ScaledObject) -> anyhow::Result<()> {
        let Some(current) = self
            .store
            .get_json::<ScaledObject>(&scaled_object_key(so))
            .await?
        else {
            debug!("ScaledObject {} deleted, dropping status", so.qualified_name());
            return Ok(());
        };
        if current.generation != so.generation {
            debug!(
                "ScaledObject {} moved to generation {}, dropping status for {}",
                so.qualified_name(),
                current.generation,
                so.generation
            );
            return Ok(());
        }
        self.store
            .put_json(&scaled_object_status_key(&so.namespace, &so.id), &so.status)
            .await
    }
}
