use serde::{Deserialize, Serialize};

use super::metric::MetricSample;
use crate::domain::value_objects::Severity;

/// Outcome of one check for one run. Never persisted as such; its metrics are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    pub severity: Severity,
    pub message: String,
    pub metrics: Vec<MetricSample>,
}

impl CheckResult {
    #[must_use]
    pub fn ok(check_name: &str, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.to_string(),
            severity: Severity::Ok,
            message: message.into(),
            metrics: Vec::new(),
        }
    }

    #[must_use]
    pub fn warning(check_name: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::ok(check_name, message)
        }
    }

    #[must_use]
    pub fn critical(check_name: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            ..Self::ok(check_name, message)
        }
    }

    /// Result standing in for a collector that could not do its job.
    #[must_use]
    pub fn collection_failure(check_name: &str, reason: &str) -> Self {
        Self::critical(check_name, format!("check could not run: {reason}"))
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Vec<MetricSample>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Accumulates per-target findings of a multi-target check into one result.
#[derive(Debug, Default)]
pub struct Findings {
    severity: Severity,
    lines: Vec<String>,
    metrics: Vec<MetricSample>,
}

impl Findings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, line: impl Into<String>) {
        self.severity = self.severity.max(severity);
        self.lines.push(line.into());
    }

    pub fn metric(&mut self, sample: MetricSample) {
        self.metrics.push(sample);
    }

    /// Builds the result; `empty_message` is used when nothing was pushed.
    #[must_use]
    pub fn into_result(self, check_name: &str, empty_message: &str) -> CheckResult {
        let message = if self.lines.is_empty() {
            empty_message.to_string()
        } else {
            self.lines.join("\n")
        };
        CheckResult {
            check_name: check_name.to_string(),
            severity: self.severity,
            message,
            metrics: self.metrics,
        }
    }
}
