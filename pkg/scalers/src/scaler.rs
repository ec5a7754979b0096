use async_trait::async_trait;
use pkg_types::metrics::MetricReading;
use pkg_types::scaledobject::TriggerSpec;

use crate::error::ScalerResult;

/// Everything a factory needs to build a scaler for one trigger.
#[derive(Debug, Clone, Copy)]
pub struct ScalerConfig<'a> {
    pub namespace: &'a str,
    pub scaled_object: &'a str,
    pub trigger: &'a TriggerSpec,
    /// Position of the trigger in the object's trigger list
    pub index: usize,
}

impl ScalerConfig<'_> {
    /// Name used in error messages and trigger health.
    pub fn trigger_name(&self) -> String {
        self.trigger.display_name(self.index)
    }

    /// Metric names are prefixed with the trigger index so two triggers of the
    /// same type on one object never collide.
    pub fn metric_name(&self, suffix: &str) -> String {
        format!("s{}-{}", self.index, suffix)
    }
}

/// Queries one external source.
///
/// Implementations are built from a validated trigger spec by a
/// [`ScalerRegistry`](crate::ScalerRegistry) factory and hold their parsed
/// metadata. `query` may block on network I/O; callers bound it with a
/// timeout and may drop the future to cancel it.
#[async_trait]
pub trait Scaler: Send + Sync {
    /// Return the current reading and whether the source is active.
    /// A reading must never be negative.
    async fn query(&self) -> ScalerResult<(MetricReading, bool)>;
}
