use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::CheckResult;
use crate::domain::entities::metric::MetricSample;
use crate::domain::value_objects::MetricUnit;

pub const LAST_BOOT: &str = "last_boot_time";
pub const UPTIME: &str = "uptime_seconds";

/// Boot times derived from uptime drift by a second or two between runs.
const BOOT_JITTER_SECS: i64 = 5;

/// Detects reboots by comparing the kernel boot time with the stored one.
pub struct RebootCheck;

#[must_use]
pub fn is_new_boot(previous: DateTime<Utc>, current: DateTime<Utc>) -> bool {
    (current - previous).abs() > Duration::seconds(BOOT_JITTER_SECS)
}

#[async_trait]
impl HealthCheck for RebootCheck {
    fn name(&self) -> &'static str {
        "reboot"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let boot = ctx.collector.boot_time()?;
        let previous = ctx
            .state
            .get_state(LAST_BOOT)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc));
        ctx.state
            .set_state(LAST_BOOT, &boot.to_rfc3339_opts(SecondsFormat::Secs, true))?;

        let uptime = (ctx.now - boot).num_seconds().max(0);
        let metric = MetricSample::new(UPTIME, uptime as f64, MetricUnit::Seconds, ctx.now);
        let booted = boot.format("%Y-%m-%d %H:%M UTC");

        let result = match previous {
            None => CheckResult::ok(self.name(), format!("baseline recorded, booted {booted}")),
            Some(prev) if is_new_boot(prev, boot) => CheckResult::warning(
                self.name(),
                format!(
                    "unplanned reboot detected: booted {booted}, previous boot {}",
                    prev.format("%Y-%m-%d %H:%M UTC")
                ),
            ),
            Some(_) => CheckResult::ok(self.name(), format!("up since {booted}")),
        };
        Ok(result.with_metrics(vec![metric]))
    }
}
