//! Trigger metadata lookup shared by the built-in scalers.
//!
//! A key resolves from, in order: the literal metadata entry, a
//! `<key>FromEnv` entry naming a resolved environment value, then the
//! trigger's auth parameters.

use crate::error::{ScalerError, ScalerResult};
use crate::scaler::ScalerConfig;

pub fn resolve(cfg: &ScalerConfig<'_>, key: &str) -> Option<String> {
    let trigger = cfg.trigger;
    if let Some(v) = trigger.metadata.get(key) {
        return Some(v.clone());
    }
    if let Some(env_key) = trigger.metadata.get(&format!("{key}FromEnv")) {
        return trigger.resolved_env.get(env_key).cloned();
    }
    trigger.auth_params.get(key).cloned()
}

pub fn required(cfg: &ScalerConfig<'_>, key: &str) -> ScalerResult<String> {
    match resolve(cfg, key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScalerError::MissingMetadata {
            trigger: cfg.trigger_name(),
            key: key.to_string(),
        }),
    }
}

fn parse_f64(cfg: &ScalerConfig<'_>, key: &str, raw: &str) -> ScalerResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScalerError::InvalidMetadata {
            trigger: cfg.trigger_name(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: "not a number".to_string(),
        })
}

/// A required target value. Zero and negative targets are rejected here so
/// replica math never divides by them.
pub fn positive_f64(cfg: &ScalerConfig<'_>, key: &str) -> ScalerResult<f64> {
    let raw = required(cfg, key)?;
    let value = parse_f64(cfg, key, &raw)?;
    if value <= 0.0 {
        return Err(ScalerError::InvalidMetadata {
            trigger: cfg.trigger_name(),
            key: key.to_string(),
            value: raw,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// An optional threshold, defaulting when absent.
pub fn non_negative_f64_or(cfg: &ScalerConfig<'_>, key: &str, default: f64) -> ScalerResult<f64> {
    let Some(raw) = resolve(cfg, key) else {
        return Ok(default);
    };
    let value = parse_f64(cfg, key, &raw)?;
    if value < 0.0 {
        return Err(ScalerError::InvalidMetadata {
            trigger: cfg.trigger_name(),
            key: key.to_string(),
            value: raw,
            reason: "must not be negative".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::scaledobject::TriggerSpec;
    use std::collections::HashMap;

    fn trigger(metadata: &[(&str, &str)]) -> TriggerSpec {
        TriggerSpec {
            trigger_type: "test".to_string(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn config(trigger: &TriggerSpec) -> ScalerConfig<'_> {
        ScalerConfig {
            namespace: "default",
            scaled_object: "worker",
            trigger,
            index: 0,
        }
    }

    #[test]
    fn resolves_from_env_and_auth() {
        let mut t = trigger(&[("queueLengthFromEnv", "QUEUE_TARGET")]);
        t.resolved_env = HashMap::from([("QUEUE_TARGET".to_string(), "7".to_string())]);
        t.auth_params = HashMap::from([("token".to_string(), "s3cr3t".to_string())]);
        let cfg = config(&t);

        assert_eq!(resolve(&cfg, "queueLength").as_deref(), Some("7"));
        assert_eq!(resolve(&cfg, "token").as_deref(), Some("s3cr3t"));
        assert_eq!(resolve(&cfg, "missing"), None);
    }

    #[test]
    fn target_must_be_positive() {
        let t = trigger(&[("zero", "0"), ("neg", "-2"), ("nan", "abc"), ("ok", "2.5")]);
        let cfg = config(&t);

        assert!(matches!(
            positive_f64(&cfg, "zero"),
            Err(ScalerError::InvalidMetadata { .. })
        ));
        assert!(positive_f64(&cfg, "neg").is_err());
        assert!(positive_f64(&cfg, "nan").is_err());
        assert!(matches!(
            positive_f64(&cfg, "absent"),
            Err(ScalerError::MissingMetadata { .. })
        ));
        assert_eq!(positive_f64(&cfg, "ok").unwrap(), 2.5);
    }

    #[test]
    fn optional_threshold_defaults() {
        let t = trigger(&[("activation", "3"), ("bad", "-1")]);
        let cfg = config(&t);
        assert_eq!(non_negative_f64_or(&cfg, "activation", 0.0).unwrap(), 3.0);
        assert_eq!(non_negative_f64_or(&cfg, "absent", 0.0).unwrap(), 0.0);
        assert!(non_negative_f64_or(&cfg, "bad", 0.0).is_err());
    }
}
