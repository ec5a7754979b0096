//! Filesystem path and listen-port constants.

// ─── Operator ──────────────────────────────────────────────────────────────

/// Default config file path for the operator.
pub const DEFAULT_OPERATOR_CONFIG: &str = "/etc/kedars/config.yaml";

/// Default data directory for the operator state store.
pub const DEFAULT_OPERATOR_DATA_DIR: &str = "/tmp/kedars-data";

/// Default port for the `/metrics` and `/healthz` endpoints.
pub const DEFAULT_METRICS_PORT: u16 = 9022;
