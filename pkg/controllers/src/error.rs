//! Scaling engine error types.

use pkg_scalers::ScalerError;
use thiserror::Error;

/// Errors that abort a polling cycle or keep a ScaledObject unreconciled.
#[derive(Debug, Error)]
pub enum ScalingError {
    /// The ScaledObject itself is malformed. No scaling happens until the
    /// spec changes.
    #[error("invalid ScaledObject {object}: {reason}")]
    InvalidSpec { object: String, reason: String },

    /// A trigger could not be resolved into a scaler.
    #[error("trigger {trigger} of {object}: {source}")]
    TriggerConfig {
        object: String,
        trigger: String,
        #[source]
        source: ScalerError,
    },

    /// Every trigger failed this cycle; current scale must be left alone.
    #[error("all {} triggers of {object} failed", .failed.len())]
    AllTriggersFailed { object: String, failed: Vec<String> },

    /// A reading reached replica math with an unusable target. Validation
    /// should make this unreachable.
    #[error("metric {metric} has non-positive target {target}")]
    InvalidTarget { metric: String, target: f64 },

    #[error("cycle cancelled")]
    Cancelled,

    #[error("resource manager: {0}")]
    Resource(#[from] anyhow::Error),
}

impl ScalingError {
    /// Configuration errors are not retried until the spec generation changes.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScalingError::InvalidSpec { .. } | ScalingError::TriggerConfig { .. }
        )
    }
}

pub type ScalingResult<T> = Result<T, ScalingError>;
