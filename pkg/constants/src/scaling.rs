//! Autoscaling defaults and wire-level conventions.

/// Label key binding a spawned Job to its owning ScaledObject.
/// Job accounting relies on this label alone.
pub const SCALED_OBJECT_LABEL: &str = "scaledobject";

/// Default polling interval for a ScaledObject, in seconds.
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 30;

/// Default cooldown period before scaling back to the minimum, in seconds.
pub const DEFAULT_COOLDOWN_PERIOD_SECS: u64 = 300;

/// Default maximum replica count when a ScaledObject leaves it unset.
pub const DEFAULT_MAX_REPLICA_COUNT: u32 = 100;

/// Default number of finished Jobs of each outcome kept per ScaledObject.
pub const DEFAULT_JOBS_HISTORY_LIMIT: u32 = 100;

/// Upper bound on a single scaler query or resource call, in seconds.
/// The effective timeout is `min(polling_interval, DEFAULT_SCALER_TIMEOUT_SECS)`.
pub const DEFAULT_SCALER_TIMEOUT_SECS: u64 = 10;

/// How often the controller rescans the store for ScaledObjects, in seconds.
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 5;
