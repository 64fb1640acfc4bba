use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::check_result::CheckResult;
use crate::domain::value_objects::Severity;

/// Outcome of one collecting run: every check, whatever its severity.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub host: String,
    pub generated_at: DateTime<Utc>,
    pub overall: Severity,
    pub results: Vec<CheckResult>,
}

/// Overall severity is the worst of all results.
#[must_use]
pub fn overall_severity(results: &[CheckResult]) -> Severity {
    Severity::worst(results.iter().map(|r| r.severity))
}

#[must_use]
pub fn evaluate(host: &str, at: DateTime<Utc>, results: Vec<CheckResult>) -> RunReport {
    RunReport {
        host: host.to_string(),
        generated_at: at,
        overall: overall_severity(&results),
        results,
    }
}

impl RunReport {
    #[must_use]
    pub fn should_alert(&self) -> bool {
        self.overall.is_alert()
    }

    pub fn alerting(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.severity.is_alert())
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.results.iter().filter(|r| r.severity == severity).count()
    }

    /// Plain-text alert message: problems in full, passing checks summarised.
    #[must_use]
    pub fn to_message(&self) -> String {
        let mut text = format!(
            "{} {} on {} ({})\n",
            self.overall.emoji(),
            self.overall,
            self.host,
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        for result in self.alerting() {
            let _ = write!(
                text,
                "\n{} {} [{}]\n{}\n",
                result.severity.emoji(),
                result.check_name,
                result.severity,
                result.message
            );
        }
        let ok = self.count(Severity::Ok);
        if ok > 0 {
            let _ = write!(text, "\n{ok} other check(s) OK");
        }
        text
    }
}

#[must_use]
pub fn test_message(host: &str, at: DateTime<Utc>) -> String {
    format!(
        "✅ Test notification from {host} ({}). Alert delivery is working.",
        at.format("%Y-%m-%d %H:%M UTC")
    )
}
