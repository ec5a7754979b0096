use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pod::PodSpec;

// --- Job status ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobCondition {
    #[default]
    Running,
    Complete,
    Failed,
}

impl JobCondition {
    /// Complete and Failed are terminal; a Job never leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobCondition::Complete | JobCondition::Failed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatus {
    pub active: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub condition: JobCondition,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
}

// --- Job spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSpec {
    pub template: PodSpec,
    /// Number of successful completions required
    #[serde(default = "default_completions")]
    pub completions: u32,
    /// Max pods running in parallel
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    /// Max failures before marking job as Failed
    #[serde(default = "default_backoff_limit")]
    pub backoff_limit: u32,
}

fn default_completions() -> u32 {
    1
}
fn default_parallelism() -> u32 {
    1
}
fn default_backoff_limit() -> u32 {
    6
}

// --- Job ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub namespace: String,
    /// Labels for selector-based listing (`scaledobject=<owner>` for scaled jobs)
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub spec: JobSpec,
    #[serde(default)]
    pub status: JobStatus,
    /// Owner reference (ScaledObject ID if spawned by one)
    #[serde(default)]
    pub owner_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// True if every `key=value` pair in `selector` is present in the Job's labels.
    pub fn matches_selector(&self, selector: &HashMap<String, String>) -> bool {
        selector
            .iter()
            .all(|(k, v)| self.labels.get(k).is_some_and(|l| l == v))
    }
}
