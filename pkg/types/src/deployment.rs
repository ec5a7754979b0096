use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pod::PodSpec;

// --- Deployment status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub ready_replicas: u32,
    pub available_replicas: u32,
}

// --- Deployment spec ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub replicas: u32,
    pub template: PodSpec,
    /// Label selector for matching pods
    #[serde(default)]
    pub selector: HashMap<String, String>,
}

// --- Deployment ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
    /// Monotonically increasing generation; bumped on spec changes
    #[serde(default)]
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}
