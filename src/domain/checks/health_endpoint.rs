use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::CheckResult;
use crate::domain::entities::metric::MetricSample;
use crate::domain::value_objects::MetricUnit;

pub const HEALTH_LATENCY: &str = "health_latency_ms";
pub const HEALTH_STATUS: &str = "health_http_status";
pub const APP_UPTIME: &str = "app_uptime_seconds";

/// GET of the application's local status document.
pub struct HealthEndpointCheck {
    pub url: String,
    pub timeout: Duration,
    pub status_field: String,
    pub healthy_value: String,
    pub required_fields: Vec<String>,
}

impl HealthEndpointCheck {
    /// Problems found in a parsed status document; empty means healthy.
    #[must_use]
    pub fn inspect_body(&self, body: &Value) -> Vec<String> {
        let mut problems = Vec::new();
        let Some(object) = body.as_object() else {
            problems.push("status document is not a JSON object".to_string());
            return problems;
        };
        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .filter(|f| !object.contains_key(f.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            problems.push(format!("missing fields: {}", missing.join(", ")));
        }
        match object.get(&self.status_field) {
            Some(Value::String(s)) if *s == self.healthy_value => {}
            Some(other) => problems.push(format!(
                "{} is {other}, expected {:?}",
                self.status_field, self.healthy_value
            )),
            None => problems.push(format!("no {} field", self.status_field)),
        }
        problems
    }
}

fn uptime_of(body: &Value) -> Option<f64> {
    body.get("metrics")?.get("uptime_seconds")?.as_f64()
}

#[async_trait]
impl HealthCheck for HealthEndpointCheck {
    fn name(&self) -> &'static str {
        "health_endpoint"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let started = Instant::now();
        let response = match ctx.network.http_get(&self.url, self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                return Ok(CheckResult::critical(
                    self.name(),
                    format!("{} unreachable: {e}", self.url),
                ));
            }
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut metrics = vec![
            MetricSample::new(HEALTH_LATENCY, latency_ms, MetricUnit::Milliseconds, ctx.now),
            MetricSample::new(
                HEALTH_STATUS,
                f64::from(response.status),
                MetricUnit::HttpStatus,
                ctx.now,
            ),
        ];

        if !response.is_success() {
            return Ok(CheckResult::critical(
                self.name(),
                format!("{} answered HTTP {}", self.url, response.status),
            )
            .with_metrics(metrics));
        }

        let body: Value = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(e) => {
                return Ok(CheckResult::critical(
                    self.name(),
                    format!("{} returned malformed JSON: {e}", self.url),
                )
                .with_metrics(metrics));
            }
        };
        if let Some(uptime) = uptime_of(&body) {
            metrics.push(MetricSample::new(APP_UPTIME, uptime, MetricUnit::Seconds, ctx.now));
        }

        let problems = self.inspect_body(&body);
        let result = if problems.is_empty() {
            CheckResult::ok(
                self.name(),
                format!("{} healthy in {latency_ms:.0} ms", self.url),
            )
        } else {
            CheckResult::critical(
                self.name(),
                format!("{} unhealthy: {}", self.url, problems.join("; ")),
            )
        };
        Ok(result.with_metrics(metrics))
    }
}
