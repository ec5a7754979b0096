use anyhow::{Result, bail};
use std::collections::HashSet;

use crate::scaledobject::ScaledObject;

/// Validate a Kubernetes-style resource name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Structural checks on a ScaledObject that do not need the scaler registry.
/// Trigger metadata is validated separately when scalers are built.
pub fn validate_scaled_object(so: &ScaledObject) -> Result<()> {
    validate_name(&so.name)?;
    let spec = &so.spec;
    if spec.max_replica_count == 0 {
        bail!("maxReplicaCount must be at least 1");
    }
    if spec.min_replica_count > spec.max_replica_count {
        bail!(
            "minReplicaCount ({}) must not exceed maxReplicaCount ({})",
            spec.min_replica_count,
            spec.max_replica_count
        );
    }
    if spec.polling_interval == 0 {
        bail!("pollingInterval must be at least 1 second");
    }
    if spec.triggers.is_empty() {
        bail!("at least one trigger is required");
    }
    // Trigger health is keyed by display name.
    let mut names = HashSet::with_capacity(spec.triggers.len());
    for (i, trigger) in spec.triggers.iter().enumerate() {
        if trigger.trigger_type.trim().is_empty() {
            bail!("trigger {} has an empty type", i);
        }
        let name = trigger.display_name(i);
        if !names.insert(name.clone()) {
            bail!("trigger {} reuses the name '{}'", i, name);
        }
    }
    Ok(())
}
