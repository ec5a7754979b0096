//! Fan-out/fan-in over the scalers of one ScaledObject.

use futures_util::future::join_all;
use pkg_scalers::{Scaler, ScalerError};
use pkg_types::metrics::MetricReading;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ScalingError, ScalingResult};

/// A trigger whose scaler has been built and validated.
pub struct ResolvedTrigger {
    pub name: String,
    pub scaler: Box<dyn Scaler>,
}

#[derive(Debug, Clone)]
pub struct TriggerReading {
    pub trigger: String,
    pub reading: MetricReading,
    pub active: bool,
}

#[derive(Debug)]
pub struct TriggerFailure {
    pub trigger: String,
    pub error: ScalerError,
}

/// Outcome of one aggregation: at least one trigger succeeded.
#[derive(Debug)]
pub struct Aggregate {
    /// True if any successful trigger reported active
    pub is_active: bool,
    /// Successful readings in trigger order
    pub readings: Vec<TriggerReading>,
    /// Triggers that failed this cycle, in trigger order
    pub failures: Vec<TriggerFailure>,
}

impl Aggregate {
    pub fn metric_readings(&self) -> Vec<MetricReading> {
        self.readings.iter().map(|r| r.reading.clone()).collect()
    }
}

pub struct MetricAggregator {
    object: String,
    triggers: Vec<ResolvedTrigger>,
    timeout: Duration,
}

impl MetricAggregator {
    pub fn new(object: String, triggers: Vec<ResolvedTrigger>, timeout: Duration) -> Self {
        Self {
            object,
            triggers,
            timeout,
        }
    }

    /// Query every trigger concurrently and combine the results.
    ///
    /// Fails with [`ScalingError::AllTriggersFailed`] if no trigger produced a
    /// reading, and with [`ScalingError::Cancelled`] if `cancel` fires first.
    pub async fn aggregate(&self, cancel: &CancellationToken) -> ScalingResult<Aggregate> {
        let queries = self.triggers.iter().map(|t| async move {
            let outcome = match tokio::time::timeout(self.timeout, t.scaler.query()).await {
                Ok(Ok((reading, active))) => check_reading(reading).map(|r| (r, active)),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ScalerError::Timeout(self.timeout.as_secs())),
            };
            (t.name.as_str(), outcome)
        });

        let results = tokio::select! {
            results = join_all(queries) => results,
            _ = cancel.cancelled() => return Err(ScalingError::Cancelled),
        };

        let mut aggregate = Aggregate {
            is_active: false,
            readings: Vec::new(),
            failures: Vec::new(),
        };
        for (trigger, outcome) in results {
            match outcome {
                Ok((reading, active)) => {
                    debug!(
                        scaledobject = %self.object,
                        trigger,
                        metric = %reading.metric_name,
                        value = reading.value,
                        active,
                        "scaler reading"
                    );
                    aggregate.is_active |= active;
                    aggregate.readings.push(TriggerReading {
                        trigger: trigger.to_string(),
                        reading,
                        active,
                    });
                }
                Err(error) => aggregate.failures.push(TriggerFailure {
                    trigger: trigger.to_string(),
                    error,
                }),
            }
        }

        if aggregate.readings.is_empty() {
            for f in &aggregate.failures {
                warn!(scaledobject = %self.object, trigger = %f.trigger, error = %f.error, "scaler failed");
            }
            return Err(ScalingError::AllTriggersFailed {
                object: self.object.clone(),
                failed: aggregate.failures.into_iter().map(|f| f.trigger).collect(),
            });
        }
        for f in &aggregate.failures {
            warn!(
                scaledobject = %self.object,
                trigger = %f.trigger,
                error = %f.error,
                "scaler failed, continuing with remaining triggers"
            );
        }
        Ok(aggregate)
    }
}

/// A negative or non-finite value is a scaler failure, never a valid zero.
fn check_reading(reading: MetricReading) -> Result<MetricReading, ScalerError> {
    if reading.value < 0.0 || !reading.value.is_finite() {
        return Err(ScalerError::NegativeValue {
            metric: reading.metric_name,
            value: reading.value,
        });
    }
    Ok(reading)
}
