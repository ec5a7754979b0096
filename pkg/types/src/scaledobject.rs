use chrono::{DateTime, Utc};
use pkg_constants::scaling;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::job::JobSpec;

// --- Scale target ---

/// What a ScaledObject scales: a long-running Deployment (via the HPA's
/// external metric) or a Job template (one Job per scale unit).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScaleTarget {
    Deployment { name: String },
    Job { template: JobSpec },
}

impl ScaleTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ScaleTarget::Deployment { .. } => "Deployment",
            ScaleTarget::Job { .. } => "Job",
        }
    }
}

// --- Trigger ---

/// One configured scaler instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSpec {
    /// Scaler type tag used for registry lookup (e.g. "metrics-api")
    #[serde(rename = "type")]
    pub trigger_type: String,
    /// Optional display name; defaults to `<type>-<index>`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Values resolved from the target's environment before the pass
    #[serde(default)]
    pub resolved_env: HashMap<String, String>,
    #[serde(default)]
    pub auth_params: HashMap<String, String>,
}

impl TriggerSpec {
    /// Stable identifier used for logging and trigger health tracking.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{}-{}", self.trigger_type, index),
        }
    }
}

// --- ScaledObject status ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum HealthStatus {
    #[default]
    Happy,
    Failing,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerHealth {
    pub status: HealthStatus,
    pub number_of_failures: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionType {
    /// Triggers resolved and the scaling loop is running
    Ready,
    /// The object is currently scaled above its minimum
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectStatus {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub last_active_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub desired_replicas: u32,
    #[serde(default)]
    pub last_poll_time: Option<DateTime<Utc>>,
    /// Spec generation the status was last computed for
    #[serde(default)]
    pub observed_generation: u64,
    #[serde(default)]
    pub health: BTreeMap<String, TriggerHealth>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ScaledObjectStatus {
    /// Set a condition, keeping its transition time if the status is unchanged.
    pub fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: bool,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => {
                if existing.status != status {
                    existing.last_transition_time = now;
                }
                existing.status = status;
                existing.reason = reason.to_string();
                existing.message = message.to_string();
            }
            None => self.conditions.push(Condition {
                condition_type,
                status,
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: now,
            }),
        }
    }

    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

// --- ScaledObject spec ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    pub target: ScaleTarget,
    #[serde(default)]
    pub min_replica_count: u32,
    #[serde(default = "default_max_replica_count")]
    pub max_replica_count: u32,
    /// Seconds between polls
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    /// Seconds of continuous inactivity before scaling back to the minimum
    #[serde(default = "default_cooldown_period")]
    pub cooldown_period: u64,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    #[serde(default = "default_history_limit")]
    pub successful_jobs_history_limit: u32,
    #[serde(default = "default_history_limit")]
    pub failed_jobs_history_limit: u32,
}

fn default_max_replica_count() -> u32 {
    scaling::DEFAULT_MAX_REPLICA_COUNT
}
fn default_polling_interval() -> u64 {
    scaling::DEFAULT_POLLING_INTERVAL_SECS
}
fn default_cooldown_period() -> u64 {
    scaling::DEFAULT_COOLDOWN_PERIOD_SECS
}
fn default_history_limit() -> u32 {
    scaling::DEFAULT_JOBS_HISTORY_LIMIT
}

// --- ScaledObject ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObject {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub spec: ScaledObjectSpec,
    #[serde(default)]
    pub status: ScaledObjectStatus,
    /// Bumped on spec changes; a change restarts the scaling loop
    #[serde(default)]
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

impl ScaledObject {
    /// `<namespace>/<name>`, used in logs and metric labels.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_gets_defaults() {
        let so: ScaledObject = serde_json::from_str(
            r#"{
                "id": "so-1",
                "name": "worker",
                "namespace": "default",
                "createdAt": "2026-01-01T00:00:00Z",
                "spec": {
                    "target": { "kind": "deployment", "name": "worker" },
                    "triggers": [{ "type": "queue-depth", "metadata": { "queueName": "q" } }]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(so.spec.min_replica_count, 0);
        assert_eq!(so.spec.max_replica_count, scaling::DEFAULT_MAX_REPLICA_COUNT);
        assert_eq!(so.spec.polling_interval, scaling::DEFAULT_POLLING_INTERVAL_SECS);
        assert_eq!(so.spec.cooldown_period, scaling::DEFAULT_COOLDOWN_PERIOD_SECS);
        assert_eq!(so.spec.target.kind(), "Deployment");
        assert_eq!(so.spec.triggers[0].display_name(0), "queue-depth-0");
        assert!(!so.status.is_active);
        assert_eq!(so.qualified_name(), "default/worker");
    }

    #[test]
    fn condition_transition_time_only_moves_on_change() {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let t1 = DateTime::from_timestamp(1_700_000_060, 0).unwrap();
        let mut status = ScaledObjectStatus::default();

        status.set_condition(ConditionType::Active, true, "ScalerActive", "", t0);
        status.set_condition(ConditionType::Active, true, "ScalerActive", "", t1);
        assert_eq!(
            status.condition(ConditionType::Active).unwrap().last_transition_time,
            t0
        );

        status.set_condition(ConditionType::Active, false, "ScalerInactive", "", t1);
        let active = status.condition(ConditionType::Active).unwrap();
        assert!(!active.status);
        assert_eq!(active.last_transition_time, t1);
        assert_eq!(status.conditions.len(), 1);
    }
}
