use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Resource requirements ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResourceRequirements {
    /// CPU in millicores (1000 = 1 core)
    #[serde(default)]
    pub cpu_millis: u64,
    /// Memory in bytes
    #[serde(default)]
    pub memory_bytes: u64,
}

// --- Container spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub resources: ResourceRequirements,
}

// --- Restart policy ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

// --- Pod status ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PodStatus {
    Pending,
    Scheduled,
    ContainerCreating,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodStatus {
    /// True once the pod holds a running slot or has finished its work.
    pub fn has_started(&self) -> bool {
        matches!(self, PodStatus::Running | PodStatus::Succeeded)
    }
}

// --- Pod spec ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSpec {
    pub containers: Vec<ContainerSpec>,
    /// Left unset in templates; Job creation fills in `OnFailure`.
    #[serde(default)]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(default)]
    pub node_affinity: HashMap<String, String>,
}

// --- Pod ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub spec: PodSpec,
    pub status: PodStatus,
    /// The node this pod is assigned to (set by scheduler)
    #[serde(default)]
    pub node_name: Option<String>,
    /// Labels for selector-based matching
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Owner reference (e.g. Job ID that created this pod)
    #[serde(default)]
    pub owner_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}
