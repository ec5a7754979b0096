//! State store key layout.
//!
//! Every resource is stored as JSON under `/registry/<kind>/<namespace>/<id>`.

/// Prefix for ScaledObject documents.
pub const SCALED_OBJECTS_PREFIX: &str = "/registry/scaledobjects/";

/// Prefix for Job documents.
pub const JOBS_PREFIX: &str = "/registry/jobs/";

/// Prefix for Pod documents.
pub const PODS_PREFIX: &str = "/registry/pods/";

/// Prefix for Deployment documents.
pub const DEPLOYMENTS_PREFIX: &str = "/registry/deployments/";

/// Prefix for external metric values published for the HPA.
pub const EXTERNAL_METRICS_PREFIX: &str = "/registry/externalmetrics/";

/// Prefix for queue items counted by the `queue-depth` scaler.
pub const QUEUES_PREFIX: &str = "/registry/queues/";

/// Prefix for ScaledObject status documents, kept apart from the spec so
/// status writes never rewrite a user's object.
pub const SCALED_OBJECT_STATUS_PREFIX: &str = "/registry/scaledobjects-status/";
