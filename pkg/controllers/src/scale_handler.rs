//! Per-object polling cycle: aggregate metrics, gate activation, act.

use chrono::{DateTime, Utc};
use pkg_metrics::ScalingMetrics;
use pkg_scalers::{ScalerConfig, ScalerRegistry};
use pkg_types::metrics::{ExternalMetricValue, MetricReading};
use pkg_types::pod::RestartPolicy;
use pkg_types::scaledobject::{
    ConditionType, HealthStatus, ScaleTarget, ScaledObject, TriggerHealth,
};
use pkg_types::validate::validate_scaled_object;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activation::{ActivationDecider, Transition};
use crate::aggregator::{Aggregate, MetricAggregator, ResolvedTrigger};
use crate::error::{ScalingError, ScalingResult};
use crate::job::JobOrchestrator;
use crate::replicas::{clamp_replicas, desired_for_readings};
use crate::resources::ResourceManager;

/// Shared handles injected into every scaling loop.
#[derive(Clone)]
pub struct ScalingContext {
    pub resources: Arc<dyn ResourceManager>,
    pub registry: ScalerRegistry,
    pub metrics: ScalingMetrics,
    /// Upper bound for one scaler query or resource-manager call
    pub scaler_timeout: Duration,
}

/// Result of one successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleDecision {
    pub is_active: bool,
    pub readings: Vec<MetricReading>,
    /// Clamped to `[min, max]`; `min` while inactive
    pub desired_replicas: u32,
}

/// Drives one ScaledObject. Built once per spec generation by [`resolve`].
///
/// [`resolve`]: ScaleHandler::resolve
pub struct ScaleHandler {
    so: ScaledObject,
    aggregator: MetricAggregator,
    decider: ActivationDecider,
    jobs: Option<JobOrchestrator>,
    resources: Arc<dyn ResourceManager>,
    metrics: ScalingMetrics,
    call_timeout: Duration,
}

impl ScaleHandler {
    /// Validate the object and build its scalers. Any error here is a
    /// configuration error: nothing is polled until the spec changes.
    pub fn resolve(so: ScaledObject, ctx: &ScalingContext) -> ScalingResult<Self> {
        let object = so.qualified_name();
        validate_scaled_object(&so).map_err(|e| ScalingError::InvalidSpec {
            object: object.clone(),
            reason: e.to_string(),
        })?;
        if let ScaleTarget::Job { template } = &so.spec.target {
            if template.template.restart_policy == Some(RestartPolicy::Always) {
                return Err(ScalingError::InvalidSpec {
                    object,
                    reason: "job template restartPolicy must be OnFailure or Never".to_string(),
                });
            }
        }

        let mut triggers = Vec::with_capacity(so.spec.triggers.len());
        for (index, trigger) in so.spec.triggers.iter().enumerate() {
            let cfg = ScalerConfig {
                namespace: &so.namespace,
                scaled_object: &so.name,
                trigger,
                index,
            };
            let scaler = ctx
                .registry
                .build(&cfg)
                .map_err(|source| ScalingError::TriggerConfig {
                    object: object.clone(),
                    trigger: cfg.trigger_name(),
                    source,
                })?;
            triggers.push(ResolvedTrigger {
                name: cfg.trigger_name(),
                scaler,
            });
        }

        let call_timeout = ctx
            .scaler_timeout
            .min(Duration::from_secs(so.spec.polling_interval));
        let jobs = match so.spec.target {
            ScaleTarget::Job { .. } => Some(JobOrchestrator::new(
                ctx.resources.clone(),
                ctx.metrics.clone(),
                call_timeout,
            )),
            ScaleTarget::Deployment { .. } => None,
        };

        Ok(Self {
            aggregator: MetricAggregator::new(object, triggers, call_timeout),
            decider: ActivationDecider::restore(so.spec.cooldown_period, &so.status),
            jobs,
            resources: ctx.resources.clone(),
            metrics: ctx.metrics.clone(),
            call_timeout,
            so,
        })
    }

    pub fn scaled_object(&self) -> &ScaledObject {
        &self.so
    }

    /// Poll on the object's interval until `cancel` fires. The first poll
    /// runs immediately.
    pub async fn run(mut self, cancel: CancellationToken) {
        let object = self.so.qualified_name();
        let period = Duration::from_secs(self.so.spec.polling_interval);
        info!(scaledobject = %object, kind = self.so.spec.target.kind(), interval = ?period, "scaling loop started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            match self.poll_once(Utc::now(), &cancel).await {
                Ok(decision) => debug!(
                    scaledobject = %object,
                    active = decision.is_active,
                    desired = decision.desired_replicas,
                    "cycle complete"
                ),
                Err(ScalingError::Cancelled) => break,
                Err(e) => warn!(scaledobject = %object, error = %e, "scaling cycle failed"),
            }
        }
        info!(scaledobject = %object, "scaling loop stopped");
    }

    /// Run one full cycle at `now` and persist the resulting status.
    ///
    /// When every trigger fails, or the cycle is cancelled, nothing outside
    /// the object's own status is touched.
    pub async fn poll_once(
        &mut self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> ScalingResult<ScaleDecision> {
        let result = self.cycle(now, cancel).await;
        match &result {
            Err(ScalingError::Cancelled) => return result,
            Err(_) => self.metrics.cycle_error(&self.so.qualified_name()),
            Ok(_) => {}
        }
        self.persist_status().await;
        result
    }

    async fn cycle(
        &mut self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> ScalingResult<ScaleDecision> {
        let object = self.so.qualified_name();
        self.so.status.last_poll_time = Some(now);
        self.so.status.observed_generation = self.so.generation;

        let aggregate = match self.aggregator.aggregate(cancel).await {
            Ok(aggregate) => aggregate,
            Err(ScalingError::AllTriggersFailed { object, failed }) => {
                for trigger in &failed {
                    self.record_failure(trigger);
                }
                return Err(ScalingError::AllTriggersFailed { object, failed });
            }
            Err(e) => return Err(e),
        };
        self.record_health(&aggregate);

        let transition = self.decider.observe(aggregate.is_active, now);
        match transition {
            Transition::Activated => info!(scaledobject = %object, "activated"),
            Transition::Deactivated => {
                info!(scaledobject = %object, cooldown = self.so.spec.cooldown_period, "deactivated after cooldown")
            }
            Transition::CoolingDown | Transition::Unchanged => {}
        }

        let readings = aggregate.metric_readings();
        let spec = &self.so.spec;
        let desired_replicas = if self.decider.is_active() {
            clamp_replicas(
                desired_for_readings(&readings)?,
                spec.min_replica_count,
                spec.max_replica_count,
            )
        } else {
            spec.min_replica_count
        };
        let decision = ScaleDecision {
            is_active: self.decider.is_active(),
            readings,
            desired_replicas,
        };

        if cancel.is_cancelled() {
            return Err(ScalingError::Cancelled);
        }

        self.update_status(&decision, now);
        match self.so.spec.target.clone() {
            ScaleTarget::Deployment { name } => self.scale_deployment(&name, &decision, now).await?,
            ScaleTarget::Job { template } => {
                if let Some(jobs) = &self.jobs {
                    jobs.reconcile(&self.so, &template, decision.desired_replicas)
                        .await?;
                }
            }
        }
        Ok(decision)
    }

    fn record_health(&mut self, aggregate: &Aggregate) {
        for reading in &aggregate.readings {
            self.so
                .status
                .health
                .insert(reading.trigger.clone(), TriggerHealth::default());
        }
        for failure in &aggregate.failures {
            self.record_failure(&failure.trigger);
        }
    }

    fn record_failure(&mut self, trigger: &str) {
        let health = self
            .so
            .status
            .health
            .entry(trigger.to_string())
            .or_default();
        health.status = HealthStatus::Failing;
        health.number_of_failures = health.number_of_failures.saturating_add(1);
        self.metrics
            .scaler_error(&self.so.qualified_name(), trigger);
    }

    fn update_status(&mut self, decision: &ScaleDecision, now: DateTime<Utc>) {
        let object = self.so.qualified_name();
        let status = &mut self.so.status;
        status.is_active = decision.is_active;
        status.last_active_time = self.decider.last_active_time();
        status.desired_replicas = decision.desired_replicas;
        status.set_condition(ConditionType::Ready, true, "ScalersReady", "", now);
        if decision.is_active {
            status.set_condition(ConditionType::Active, true, "ScalerActive", "", now);
        } else {
            status.set_condition(
                ConditionType::Active,
                false,
                "ScalerInactive",
                "no trigger is active",
                now,
            );
        }

        self.metrics.active(&object, decision.is_active);
        self.metrics
            .desired_replicas(&object, decision.desired_replicas);
        for reading in &decision.readings {
            self.metrics
                .metric_value(&object, &reading.metric_name, reading.value);
        }
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("{} timed out after {:?}", what, self.call_timeout),
        }
    }

    /// Publish the external metric for the HPA, then perform the 0 <-> min
    /// transitions the HPA cannot.
    async fn scale_deployment(
        &self,
        name: &str,
        decision: &ScaleDecision,
        now: DateTime<Utc>,
    ) -> ScalingResult<()> {
        let object = self.so.qualified_name();
        let value = ExternalMetricValue {
            scaled_object: self.so.name.clone(),
            namespace: self.so.namespace.clone(),
            readings: decision.readings.clone(),
            desired_replicas: decision.desired_replicas,
            is_active: decision.is_active,
            timestamp: now,
        };
        self.bounded(
            "publishing external metric",
            self.resources.publish_external_metric(&value),
        )
        .await?;

        let Some(mut deployment) = self
            .bounded(
                "reading deployment",
                self.resources.get_deployment(&self.so.namespace, name),
            )
            .await?
        else {
            warn!(scaledobject = %object, deployment = name, "target deployment not found");
            return Ok(());
        };

        let current = deployment.spec.replicas;
        let min = self.so.spec.min_replica_count;
        let replicas = if decision.is_active {
            let floor = min.max(1);
            (current < floor).then_some(floor)
        } else {
            (current != min).then_some(min)
        };
        if let Some(replicas) = replicas {
            deployment.spec.replicas = replicas;
            self.bounded(
                "updating deployment",
                self.resources.update_deployment(&deployment),
            )
            .await?;
            info!(
                scaledobject = %object,
                deployment = name,
                from = current,
                to = replicas,
                "scaled deployment"
            );
        }
        Ok(())
    }

    async fn persist_status(&self) {
        if let Err(e) = self
            .bounded("updating status", self.resources.update_status(&self.so))
            .await
        {
            warn!(scaledobject = %self.so.qualified_name(), error = %e, "failed to persist status");
        }
    }
}
