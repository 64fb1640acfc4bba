use async_trait::async_trait;

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::CheckResult;
use crate::domain::entities::host::MemoryReading;
use crate::domain::entities::metric::MetricSample;
use crate::domain::value_objects::{MetricUnit, Severity};

pub const MEMORY_USED: &str = "memory_used_percent";

pub struct MemoryCheck {
    pub critical_percent: f64,
}

impl MemoryCheck {
    /// CRIT once usage reaches the threshold.
    #[must_use]
    pub fn classify(&self, reading: &MemoryReading) -> Severity {
        if reading.used_percent() >= self.critical_percent {
            Severity::Critical
        } else {
            Severity::Ok
        }
    }
}

#[async_trait]
impl HealthCheck for MemoryCheck {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let reading = ctx.collector.memory()?;
        let used = reading.used_percent();
        let sample = MetricSample::new(MEMORY_USED, used, MetricUnit::Percent, ctx.now);

        let result = match self.classify(&reading) {
            Severity::Critical => CheckResult::critical(
                self.name(),
                format!(
                    "memory {used:.1}% used (threshold {:.0}%)",
                    self.critical_percent
                ),
            ),
            _ => CheckResult::ok(self.name(), format!("memory {used:.1}% used")),
        };
        Ok(result.with_metrics(vec![sample]))
    }
}
