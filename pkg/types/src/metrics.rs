use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One value produced by a scaler query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricReading {
    pub metric_name: String,
    pub value: f64,
    /// Per-replica target; always positive after validation
    pub target_value: f64,
    /// Readings at or below this value do not activate the object
    #[serde(default)]
    pub activation_threshold: f64,
}

impl MetricReading {
    pub fn new(metric_name: impl Into<String>, value: f64, target_value: f64) -> Self {
        Self {
            metric_name: metric_name.into(),
            value,
            target_value,
            activation_threshold: 0.0,
        }
    }

    pub fn with_activation_threshold(mut self, threshold: f64) -> Self {
        self.activation_threshold = threshold;
        self
    }

    /// Whether this reading alone is enough to activate its object.
    pub fn exceeds_activation(&self) -> bool {
        self.value > self.activation_threshold
    }
}

/// External metric published for the HPA of a Deployment target.
/// Stored at `/registry/externalmetrics/<namespace>/<scaledobject>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetricValue {
    pub scaled_object: String,
    pub namespace: String,
    pub readings: Vec<MetricReading>,
    pub desired_replicas: u32,
    pub is_active: bool,
    pub timestamp: DateTime<Utc>,
}
