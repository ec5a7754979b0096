//! `queue-depth` scaler: counts work items queued in the state store under
//! `/registry/queues/<namespace>/<queueName>/`.
//!
//! Metadata: `queueName` (required), `queueLength` (required, > 0, items per
//! replica), `activationQueueLength` (optional, default 0).

use anyhow::Context;
use async_trait::async_trait;
use pkg_constants::state::QUEUES_PREFIX;
use pkg_state::client::StateStore;
use pkg_types::metrics::MetricReading;
use tracing::debug;

use crate::error::ScalerResult;
use crate::metadata;
use crate::scaler::{Scaler, ScalerConfig};

pub struct QueueDepthScaler {
    store: StateStore,
    prefix: String,
    queue_length: f64,
    activation_queue_length: f64,
    metric_name: String,
}

impl QueueDepthScaler {
    pub const TRIGGER_TYPE: &'static str = "queue-depth";

    pub fn from_config(cfg: &ScalerConfig<'_>, store: StateStore) -> ScalerResult<Self> {
        let queue = metadata::required(cfg, "queueName")?;
        Ok(Self {
            store,
            prefix: format!("{}{}/{}/", QUEUES_PREFIX, cfg.namespace, queue),
            queue_length: metadata::positive_f64(cfg, "queueLength")?,
            activation_queue_length: metadata::non_negative_f64_or(
                cfg,
                "activationQueueLength",
                0.0,
            )?,
            metric_name: cfg.metric_name(&format!("queue-{}", queue)),
        })
    }
}

#[async_trait]
impl Scaler for QueueDepthScaler {
    async fn query(&self) -> ScalerResult<(MetricReading, bool)> {
        let items = self
            .store
            .list_prefix(&self.prefix)
            .await
            .with_context(|| format!("listing {}", self.prefix))?;
        let depth = items.len() as f64;
        debug!(prefix = %self.prefix, depth, "queue-depth reading");

        let reading = MetricReading::new(&self.metric_name, depth, self.queue_length)
            .with_activation_threshold(self.activation_queue_length);
        let active = reading.exceeds_activation();
        Ok((reading, active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::scaledobject::TriggerSpec;

    fn trigger(metadata: &[(&str, &str)]) -> TriggerSpec {
        TriggerSpec {
            trigger_type: QueueDepthScaler::TRIGGER_TYPE.to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn config(trigger: &TriggerSpec) -> ScalerConfig<'_> {
        ScalerConfig {
            namespace: "batch",
            scaled_object: "worker",
            trigger,
            index: 0,
        }
    }

    #[tokio::test]
    async fn counts_items_in_own_queue_only() {
        let store = StateStore::in_memory().await.unwrap();
        for i in 0..5 {
            store
                .put(&format!("/registry/queues/batch/orders/{}", i), b"{}")
                .await
                .unwrap();
        }
        store.put("/registry/queues/batch/refunds/0", b"{}").await.unwrap();
        store.put("/registry/queues/other/orders/0", b"{}").await.unwrap();

        let t = trigger(&[("queueName", "orders"), ("queueLength", "2")]);
        let scaler = QueueDepthScaler::from_config(&config(&t), store).unwrap();
        let (reading, active) = scaler.query().await.unwrap();

        assert_eq!(reading.value, 5.0);
        assert_eq!(reading.target_value, 2.0);
        assert_eq!(reading.metric_name, "s0-queue-orders");
        assert!(active);
    }

    #[tokio::test]
    async fn empty_queue_is_inactive() {
        let store = StateStore::in_memory().await.unwrap();
        let t = trigger(&[("queueName", "orders"), ("queueLength", "2")]);
        let scaler = QueueDepthScaler::from_config(&config(&t), store).unwrap();
        let (reading, active) = scaler.query().await.unwrap();
        assert_eq!(reading.value, 0.0);
        assert!(!active);
    }

    #[tokio::test]
    async fn missing_queue_name_is_rejected() {
        let store = StateStore::in_memory().await.unwrap();
        let t = trigger(&[("queueLength", "2")]);
        let err = QueueDepthScaler::from_config(&config(&t), store).err().unwrap();
        assert!(err.is_config_error());
    }
}
