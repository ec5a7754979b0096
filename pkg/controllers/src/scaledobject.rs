use chrono::Utc;
use pkg_constants::state::{SCALED_OBJECT_STATUS_PREFIX, SCALED_OBJECTS_PREFIX};
use pkg_state::client::StateStore;
use pkg_types::scaledobject::{ConditionType, ScaledObject, ScaledObjectStatus};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ScalingError;
use crate::scale_handler::{ScaleHandler, ScalingContext};

enum Managed {
    /// A scaling loop is polling this generation
    Running {
        object: String,
        generation: u64,
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
    /// This generation failed to resolve; wait for a spec change
    Rejected { object: String, generation: u64 },
}

impl Managed {
    fn generation(&self) -> u64 {
        match self {
            Managed::Running { generation, .. } | Managed::Rejected { generation, .. } => {
                *generation
            }
        }
    }

    fn object(&self) -> &str {
        match self {
            Managed::Running { object, .. } | Managed::Rejected { object, .. } => object,
        }
    }

    fn stop(self) -> Option<JoinHandle<()>> {
        match self {
            Managed::Running { cancel, handle, .. } => {
                cancel.cancel();
                Some(handle)
            }
            Managed::Rejected { .. } => None,
        }
    }
}

/// ScaledObject controller.
/// Keeps exactly one scaling loop per stored ScaledObject, restarting it when
/// the spec generation changes and cancelling it when the object is deleted.
pub struct ScaledObjectController {
    store: StateStore,
    ctx: ScalingContext,
    resync_interval: Duration,
    managed: HashMap<String, Managed>,
}

impl ScaledObjectController {
    pub fn new(store: StateStore, ctx: ScalingContext, resync_interval: Duration) -> Self {
        Self {
            store,
            ctx,
            resync_interval,
            managed: HashMap::new(),
        }
    }

    pub fn start(mut self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "ScaledObjectController started (resync={}s)",
                self.resync_interval.as_secs()
            );
            let mut interval = tokio::time::interval(self.resync_interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if let Err(e) = self.reconcile(&shutdown).await {
                    warn!("ScaledObjectController reconcile error: {}", e);
                }
            }
            self.stop_all().await;
            info!("ScaledObjectController stopped");
        })
    }

    /// Number of objects with a live scaling loop.
    pub fn running(&self) -> usize {
        self.managed
            .values()
            .filter(|m| matches!(m, Managed::Running { .. }))
            .count()
    }

    /// Bring the set of scaling loops in line with the stored objects.
    pub async fn reconcile(&mut self, shutdown: &CancellationToken) -> anyhow::Result<()> {
        let entries = self.store.list_prefix(SCALED_OBJECTS_PREFIX).await?;

        let mut seen = HashSet::with_capacity(entries.len());
        for (key, raw) in entries {
            seen.insert(key.clone());
            match serde_json::from_slice::<ScaledObject>(&raw) {
                Ok(so) => self.sync(key, so, shutdown).await,
                Err(e) => self.reject_undecodable(key, &raw, &e).await,
            }
        }

        let gone: Vec<String> = self
            .managed
            .keys()
            .filter(|k| !seen.contains(*k))
            .cloned()
            .collect();
        for key in gone {
            if let Some(managed) = self.managed.remove(&key) {
                info!("ScaledObject {} deleted, stopping scaling loop", managed.object());
                self.retire(managed).await;
            }
            if let Err(e) = self.store.delete(&status_key(&key)).await {
                warn!("Failed to remove status of {}: {}", key, e);
            }
        }
        Ok(())
    }

    async fn sync(&mut self, key: String, mut so: ScaledObject, shutdown: &CancellationToken) {
        match self.managed.get(&key) {
            Some(Managed::Running { generation, handle, .. })
                if *generation == so.generation && !handle.is_finished() =>
            {
                return;
            }
            Some(Managed::Rejected { generation, .. }) if *generation == so.generation => {
                return;
            }
            _ => {}
        }

        if let Some(previous) = self.managed.remove(&key) {
            info!(
                "ScaledObject {} changed (generation {} -> {}), restarting scaling loop",
                previous.object(),
                previous.generation(),
                so.generation
            );
            self.retire(previous).await;
        }

        match self
            .store
            .get_json::<ScaledObjectStatus>(&status_key(&key))
            .await
        {
            Ok(Some(status)) => so.status = status,
            Ok(None) => {}
            Err(e) => warn!(
                "Ignoring unreadable status of ScaledObject {}: {}",
                so.qualified_name(),
                e
            ),
        }

        let managed = self.admit(so, shutdown).await;
        self.managed.insert(key, managed);
    }

    /// A stored document that does not decode as a ScaledObject. Any loop
    /// driving an earlier generation is stopped and the object is marked not
    /// ready until its document changes.
    async fn reject_undecodable(&mut self, key: String, raw: &[u8], err: &serde_json::Error) {
        let doc: serde_json::Value = serde_json::from_slice(raw).unwrap_or_default();
        let generation = doc.get("generation").and_then(|g| g.as_u64()).unwrap_or(0);
        let object = match (
            doc.get("namespace").and_then(|v| v.as_str()),
            doc.get("name").and_then(|v| v.as_str()),
        ) {
            (Some(ns), Some(name)) => format!("{}/{}", ns, name),
            _ => key.trim_start_matches(SCALED_OBJECTS_PREFIX).to_string(),
        };

        if matches!(
            self.managed.get(&key),
            Some(Managed::Rejected { generation: g, .. }) if *g == generation
        ) {
            return;
        }
        if let Some(previous) = self.managed.remove(&key) {
            self.retire(previous).await;
        }

        warn!("ScaledObject {} rejected: invalid document: {}", object, err);
        let mut status = ScaledObjectStatus {
            observed_generation: generation,
            ..Default::default()
        };
        status.set_condition(
            ConditionType::Ready,
            false,
            "InvalidSpec",
            &format!("invalid document: {}", err),
            Utc::now(),
        );
        if let Err(e) = self.store.put_json(&status_key(&key), &status).await {
            warn!("Failed to record status of ScaledObject {}: {}", object, e);
        }
        self.managed.insert(key, Managed::Rejected { object, generation });
    }

    /// Stop a superseded loop and drop the series it published.
    async fn retire(&self, managed: Managed) {
        let object = managed.object().to_string();
        if let Some(handle) = managed.stop() {
            let _ = handle.await;
        }
        self.ctx.metrics.forget(&object);
    }

    async fn admit(&self, so: ScaledObject, shutdown: &CancellationToken) -> Managed {
        let object = so.qualified_name();
        let generation = so.generation;
        match ScaleHandler::resolve(so.clone(), &self.ctx) {
            Ok(handler) => {
                let cancel = shutdown.child_token();
                let handle = tokio::spawn(handler.run(cancel.clone()));
                Managed::Running {
                    object,
                    generation,
                    cancel,
                    handle,
                }
            }
            Err(e) => {
                warn!("ScaledObject {} rejected: {}", object, e);
                self.mark_not_ready(so, &e).await;
                Managed::Rejected { object, generation }
            }
        }
    }

    async fn mark_not_ready(&self, mut so: ScaledObject, err: &ScalingError) {
        let reason = match err {
            ScalingError::TriggerConfig { .. } => "TriggerError",
            _ => "InvalidSpec",
        };
        so.status.observed_generation = so.generation;
        so.status
            .set_condition(ConditionType::Ready, false, reason, &err.to_string(), Utc::now());
        if let Err(e) = self.ctx.resources.update_status(&so).await {
            warn!(
                "Failed to record status of ScaledObject {}: {}",
                so.qualified_name(),
                e
            );
        }
    }

    async fn stop_all(&mut self) {
        for (_, managed) in self.managed.drain() {
            if let Some(handle) = managed.stop() {
                let _ = handle.await;
            }
        }
    }
}

/// Status document of the ScaledObject stored under `key`.
fn status_key(key: &str) -> String {
    format!(
        "{}{}",
        SCALED_OBJECT_STATUS_PREFIX,
        key.trim_start_matches(SCALED_OBJECTS_PREFIX)
    )
}
