//! Metric families emitted by the scaling engine.

use std::sync::Arc;

use crate::MetricsRegistry;

pub const SCALER_ERRORS_TOTAL: &str = "kedars_scaler_errors_total";
pub const CYCLE_ERRORS_TOTAL: &str = "kedars_scaledobject_cycle_errors_total";
pub const JOBS_CREATED_TOTAL: &str = "kedars_jobs_created_total";
pub const JOB_CREATE_ERRORS_TOTAL: &str = "kedars_job_create_errors_total";
pub const DESIRED_REPLICAS: &str = "kedars_scaledobject_desired_replicas";
pub const ACTIVE: &str = "kedars_scaledobject_active";
pub const METRIC_VALUE: &str = "kedars_scaler_metric_value";

const OBJECT_LABEL: &str = "scaledobject";

/// Typed facade over [`MetricsRegistry`] used by the scale loops.
#[derive(Clone)]
pub struct ScalingMetrics {
    registry: Arc<MetricsRegistry>,
}

impl ScalingMetrics {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        registry.register_counter(SCALER_ERRORS_TOTAL, "Failed scaler queries");
        registry.register_counter(CYCLE_ERRORS_TOTAL, "Polling cycles aborted without scaling");
        registry.register_counter(JOBS_CREATED_TOTAL, "Jobs created for scaled jobs");
        registry.register_counter(JOB_CREATE_ERRORS_TOTAL, "Job create calls that failed");
        registry.register_gauge(DESIRED_REPLICAS, "Last computed desired replica count");
        registry.register_gauge(ACTIVE, "1 if the object is active, 0 otherwise");
        registry.register_gauge(METRIC_VALUE, "Last metric value reported by a scaler (truncated)");
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn scaler_error(&self, object: &str, trigger: &str) {
        self.registry.counter_inc(
            SCALER_ERRORS_TOTAL,
            &[(OBJECT_LABEL, object), ("trigger", trigger)],
        );
    }

    pub fn cycle_error(&self, object: &str) {
        self.registry
            .counter_inc(CYCLE_ERRORS_TOTAL, &[(OBJECT_LABEL, object)]);
    }

    pub fn jobs_created(&self, object: &str, count: u32) {
        self.registry
            .counter_add(JOBS_CREATED_TOTAL, &[(OBJECT_LABEL, object)], u64::from(count));
    }

    pub fn job_create_error(&self, object: &str) {
        self.registry
            .counter_inc(JOB_CREATE_ERRORS_TOTAL, &[(OBJECT_LABEL, object)]);
    }

    pub fn desired_replicas(&self, object: &str, replicas: u32) {
        self.registry
            .gauge_set(DESIRED_REPLICAS, &[(OBJECT_LABEL, object)], i64::from(replicas));
    }

    pub fn active(&self, object: &str, active: bool) {
        self.registry
            .gauge_set(ACTIVE, &[(OBJECT_LABEL, object)], i64::from(active));
    }

    pub fn metric_value(&self, object: &str, metric: &str, value: f64) {
        self.registry.gauge_set(
            METRIC_VALUE,
            &[(OBJECT_LABEL, object), ("metric", metric)],
            value as i64,
        );
    }

    /// Forget every series of a deleted object.
    pub fn forget(&self, object: &str) {
        self.registry.remove_series_with(OBJECT_LABEL, object);
    }
}

impl Default for ScalingMetrics {
    fn default() -> Self {
        Self::new(Arc::new(MetricsRegistry::new()))
    }
}
