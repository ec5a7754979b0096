//! `metrics-api` scaler: reads a number out of a JSON document served over HTTP.
//!
//! Metadata:
//! - `url` (required)
//! - `valueLocation` (required): dot path into the document, e.g. `stats.queue.depth`
//!   or `items.0.value`
//! - `targetValue` (required, > 0)
//! - `activationTargetValue` (optional, default 0)
//!
//! A `token` auth parameter is sent as a bearer token.

use anyhow::Context;
use async_trait::async_trait;
use pkg_types::metrics::MetricReading;
use serde_json::Value;
use tracing::debug;

use crate::error::{ScalerError, ScalerResult};
use crate::metadata;
use crate::scaler::{Scaler, ScalerConfig};

pub struct MetricsApiScaler {
    client: reqwest::Client,
    url: String,
    value_location: String,
    target_value: f64,
    activation_target_value: f64,
    bearer_token: Option<String>,
    metric_name: String,
}

impl MetricsApiScaler {
    pub const TRIGGER_TYPE: &'static str = "metrics-api";

    pub fn from_config(cfg: &ScalerConfig<'_>, client: reqwest::Client) -> ScalerResult<Self> {
        let url = metadata::required(cfg, "url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ScalerError::InvalidMetadata {
                trigger: cfg.trigger_name(),
                key: "url".to_string(),
                value: url,
                reason: "must be an http(s) URL".to_string(),
            });
        }
        let value_location = metadata::required(cfg, "valueLocation")?;
        Ok(Self {
            client,
            metric_name: cfg.metric_name(&format!("metric-api-{}", value_location)),
            url,
            value_location,
            target_value: metadata::positive_f64(cfg, "targetValue")?,
            activation_target_value: metadata::non_negative_f64_or(
                cfg,
                "activationTargetValue",
                0.0,
            )?,
            bearer_token: cfg.trigger.auth_params.get("token").cloned(),
        })
    }
}

#[async_trait]
impl Scaler for MetricsApiScaler {
    async fn query(&self) -> ScalerResult<(MetricReading, bool)> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let doc: Value = request
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()
            .with_context(|| format!("GET {}", self.url))?
            .json()
            .await
            .context("response is not JSON")?;

        let value = value_at_path(&doc, &self.value_location).ok_or_else(|| {
            anyhow::anyhow!("no numeric value at '{}'", self.value_location)
        })?;
        if value < 0.0 {
            return Err(ScalerError::NegativeValue {
                metric: self.metric_name.clone(),
                value,
            });
        }
        debug!(url = %self.url, value, "metrics-api reading");

        let reading = MetricReading::new(&self.metric_name, value, self.target_value)
            .with_activation_threshold(self.activation_target_value);
        let active = reading.exceeds_activation();
        Ok((reading, active))
    }
}

/// Walk a dot-separated path through objects and arrays. Numbers and numeric
/// strings both resolve.
pub fn value_at_path(doc: &Value, path: &str) -> Option<f64> {
    let mut current = doc;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::scaledobject::TriggerSpec;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn trigger(url: &str, location: &str, target: &str) -> TriggerSpec {
        TriggerSpec {
            trigger_type: MetricsApiScaler::TRIGGER_TYPE.to_string(),
            metadata: [
                ("url", url),
                ("valueLocation", location),
                ("targetValue", target),
                ("activationTargetValue", "2"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            ..Default::default()
        }
    }

    fn config(trigger: &TriggerSpec) -> ScalerConfig<'_> {
        ScalerConfig {
            namespace: "default",
            scaled_object: "worker",
            trigger,
            index: 1,
        }
    }

    #[test]
    fn walks_nested_paths() {
        let doc = json!({
            "stats": { "depth": 12, "lag": "3.5" },
            "items": [ { "value": 1 }, { "value": 9 } ]
        });
        assert_eq!(value_at_path(&doc, "stats.depth"), Some(12.0));
        assert_eq!(value_at_path(&doc, "stats.lag"), Some(3.5));
        assert_eq!(value_at_path(&doc, "items.1.value"), Some(9.0));
        assert_eq!(value_at_path(&doc, "items.7.value"), None);
        assert_eq!(value_at_path(&doc, "stats"), None);
    }

    #[test]
    fn rejects_bad_metadata() {
        let t = trigger("ftp://host/x", "a", "5");
        assert!(MetricsApiScaler::from_config(&config(&t), reqwest::Client::new()).is_err());

        let t = trigger("http://host/x", "a", "0");
        let err = MetricsApiScaler::from_config(&config(&t), reqwest::Client::new())
            .err()
            .unwrap();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn queries_json_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queue": {"depth": 12}})))
            .mount(&server)
            .await;

        let mut t = trigger(&format!("{}/stats", server.uri()), "queue.depth", "3");
        t.auth_params.insert("token".to_string(), "abc".to_string());
        let scaler = MetricsApiScaler::from_config(&config(&t), reqwest::Client::new()).unwrap();

        let (reading, active) = scaler.query().await.unwrap();
        assert_eq!(reading.value, 12.0);
        assert_eq!(reading.target_value, 3.0);
        assert_eq!(reading.metric_name, "s1-metric-api-queue.depth");
        assert!(active);
    }

    #[tokio::test]
    async fn below_activation_is_inactive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"depth": 2})))
            .mount(&server)
            .await;

        let t = trigger(&server.uri(), "depth", "3");
        let scaler = MetricsApiScaler::from_config(&config(&t), reqwest::Client::new()).unwrap();
        let (reading, active) = scaler.query().await.unwrap();
        assert_eq!(reading.value, 2.0);
        assert!(!active);
    }

    #[tokio::test]
    async fn negative_and_server_errors_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/neg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"depth": -1})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let t = trigger(&format!("{}/neg", server.uri()), "depth", "3");
        let scaler = MetricsApiScaler::from_config(&config(&t), reqwest::Client::new()).unwrap();
        assert!(matches!(
            scaler.query().await,
            Err(ScalerError::NegativeValue { .. })
        ));

        let t = trigger(&format!("{}/down", server.uri()), "depth", "3");
        let scaler = MetricsApiScaler::from_config(&config(&t), reqwest::Client::new()).unwrap();
        assert!(matches!(scaler.query().await, Err(ScalerError::Source(_))));
    }
}
