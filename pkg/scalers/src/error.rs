//! Scaler error types.

use thiserror::Error;

/// Errors raised while building or querying a scaler.
///
/// The first group are configuration errors, surfaced before any poll runs.
/// The rest are per-trigger runtime failures that degrade aggregation.
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("unknown trigger type: {0}")]
    UnknownTriggerType(String),

    #[error("trigger {trigger}: missing required metadata '{key}'")]
    MissingMetadata { trigger: String, key: String },

    #[error("trigger {trigger}: invalid value '{value}' for '{key}': {reason}")]
    InvalidMetadata {
        trigger: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("metric {metric} produced a negative value ({value})")]
    NegativeValue { metric: String, value: f64 },

    #[error("query timed out after {0}s")]
    Timeout(u64),

    #[error("query failed: {0}")]
    Source(#[from] anyhow::Error),
}

impl ScalerError {
    /// Configuration errors are permanent until the spec changes.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScalerError::UnknownTriggerType(_)
                | ScalerError::MissingMetadata { .. }
                | ScalerError::InvalidMetadata { .. }
        )
    }
}

pub type ScalerResult<T> = Result<T, ScalerError>;
