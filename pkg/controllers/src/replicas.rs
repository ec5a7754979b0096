//! Replica math shared by the Deployment and Job paths.

use pkg_types::metrics::MetricReading;

use crate::error::{ScalingError, ScalingResult};

/// `ceil(current / target)`.
///
/// A non-positive target is a configuration error that validation rejects
/// before any poll; it is reported here rather than divided by. Results that
/// overflow `u32` saturate.
pub fn desired_replicas(current: f64, target: f64) -> ScalingResult<u32> {
    if !(target > 0.0) || !target.is_finite() {
        return Err(ScalingError::InvalidTarget {
            metric: String::new(),
            target,
        });
    }
    if current <= 0.0 {
        return Ok(0);
    }
    Ok((current / target).ceil() as u32)
}

/// The most demanding reading wins.
pub fn desired_for_readings(readings: &[MetricReading]) -> ScalingResult<u32> {
    let mut desired = 0;
    for reading in readings {
        let replicas = desired_replicas(reading.value, reading.target_value).map_err(|e| match e {
            ScalingError::InvalidTarget { target, .. } => ScalingError::InvalidTarget {
                metric: reading.metric_name.clone(),
                target,
            },
            other => other,
        })?;
        desired = desired.max(replicas);
    }
    Ok(desired)
}

/// Clamp to `[min, max]`. The minimum wins if the bounds are inverted.
pub fn clamp_replicas(desired: u32, min: u32, max: u32) -> u32 {
    desired.min(max).max(min)
}
