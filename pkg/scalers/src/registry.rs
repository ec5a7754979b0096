use pkg_state::client::StateStore;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ScalerError, ScalerResult};
use crate::metrics_api::MetricsApiScaler;
use crate::queue_depth::QueueDepthScaler;
use crate::scaler::{Scaler, ScalerConfig};

/// Builds a scaler for one trigger, validating its metadata.
pub type ScalerFactory =
    Arc<dyn Fn(&ScalerConfig<'_>) -> ScalerResult<Box<dyn Scaler>> + Send + Sync>;

/// Construction registry keyed by trigger type.
#[derive(Clone, Default)]
pub struct ScalerRegistry {
    factories: HashMap<String, ScalerFactory>,
}

impl ScalerRegistry {
    /// An empty registry. Tests register fakes into it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the scalers that ship with the operator.
    pub fn with_builtins(store: StateStore, http: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(MetricsApiScaler::TRIGGER_TYPE, move |cfg| {
            Ok(Box::new(MetricsApiScaler::from_config(cfg, http.clone())?))
        });
        registry.register(QueueDepthScaler::TRIGGER_TYPE, move |cfg| {
            Ok(Box::new(QueueDepthScaler::from_config(cfg, store.clone())?))
        });
        registry
    }

    /// Register (or replace) the factory for `trigger_type`.
    pub fn register<F>(&mut self, trigger_type: &str, factory: F)
    where
        F: Fn(&ScalerConfig<'_>) -> ScalerResult<Box<dyn Scaler>> + Send + Sync + 'static,
    {
        self.factories
            .insert(trigger_type.to_string(), Arc::new(factory));
    }

    /// Build the scaler for one trigger. Fails on unknown types and bad metadata.
    pub fn build(&self, cfg: &ScalerConfig<'_>) -> ScalerResult<Box<dyn Scaler>> {
        let factory = self
            .factories
            .get(&cfg.trigger.trigger_type)
            .ok_or_else(|| ScalerError::UnknownTriggerType(cfg.trigger.trigger_type.clone()))?;
        factory(cfg)
    }

    /// Registered trigger types, sorted.
    pub fn trigger_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
