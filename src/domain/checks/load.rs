use async_trait::async_trait;
use chrono::Duration;

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::CheckResult;
use crate::domain::entities::metric::MetricSample;
use crate::domain::value_objects::MetricUnit;

pub const LOAD_1M: &str = "loadavg_1m";
pub const LOAD_5M: &str = "loadavg_5m";
pub const LOAD_15M: &str = "loadavg_15m";
pub const LOAD_PERCENT: &str = "load_percent";

/// Trailing-window load average compared against the core count.
pub struct LoadCheck {
    pub window_minutes: u32,
    /// Overrides the detected core count
    pub cores: Option<usize>,
}

/// Mean of the stored 1-minute samples plus the current reading.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn window_mean(history: &[f64], current: f64) -> f64 {
    let sum: f64 = history.iter().sum::<f64>() + current;
    sum / (history.len() + 1) as f64
}

#[async_trait]
impl HealthCheck for LoadCheck {
    fn name(&self) -> &'static str {
        "load"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let load = ctx.collector.load_average()?;
        let cores = self.cores.unwrap_or_else(|| ctx.collector.cpu_cores()).max(1);
        let since = ctx.now - Duration::minutes(i64::from(self.window_minutes));
        let history: Vec<f64> = ctx
            .metrics
            .query_metrics(LOAD_1M, since)?
            .into_iter()
            .map(|s| s.value)
            .collect();
        let mean = window_mean(&history, load.one);
        let percent = load.one / cores as f64 * 100.0;

        let metrics = vec![
            MetricSample::new(LOAD_1M, load.one, MetricUnit::Load, ctx.now),
            MetricSample::new(LOAD_5M, load.five, MetricUnit::Load, ctx.now),
            MetricSample::new(LOAD_15M, load.fifteen, MetricUnit::Load, ctx.now),
            MetricSample::new(LOAD_PERCENT, percent, MetricUnit::Percent, ctx.now),
        ];

        let summary = format!(
            "{}-minute mean {mean:.2} over {} samples on {cores} cores (now {:.2} / {:.2} / {:.2})",
            self.window_minutes,
            history.len() + 1,
            load.one,
            load.five,
            load.fifteen
        );
        let result = if mean > cores as f64 {
            CheckResult::critical(self.name(), format!("load too high: {summary}"))
        } else {
            CheckResult::ok(self.name(), summary)
        };
        Ok(result.with_metrics(metrics))
    }
}
