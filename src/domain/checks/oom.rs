use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use super::{excerpt, CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::CheckResult;
use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::CommandSpec;
use crate::domain::value_objects::MetricUnit;

pub const LAST_OOM_SCAN: &str = "last_oom_scan_time";
pub const OOM_EVENTS: &str = "oom_events";

const OOM_PATTERN: &str = r"(?i)out of memory|kill(ed)? process|oom-kill";
const JOURNAL_LINES: &str = "200";

/// Kernel journal scan for OOM-killer activity since the previous run.
pub struct OomCheck {
    pub timeout: Duration,
}

impl OomCheck {
    fn command(&self, since: Option<DateTime<Utc>>) -> CommandSpec {
        let mut args = vec![
            "-k".to_string(),
            "-n".to_string(),
            JOURNAL_LINES.to_string(),
            "--no-pager".to_string(),
        ];
        if let Some(since) = since {
            args.push("--since".to_string());
            args.push(format!("@{}", since.timestamp()));
        }
        CommandSpec::new("journalctl", args, self.timeout)
    }
}

/// Lines of `journal` that look like OOM-killer activity.
///
/// # Errors
///
/// Returns `CheckError::UnexpectedOutput` if the built-in pattern fails to compile.
pub fn oom_lines(journal: &str) -> Result<Vec<&str>, CheckError> {
    let pattern =
        Regex::new(OOM_PATTERN).map_err(|e| CheckError::UnexpectedOutput(e.to_string()))?;
    Ok(journal.lines().filter(|l| pattern.is_match(l)).collect())
}

#[async_trait]
impl HealthCheck for OomCheck {
    fn name(&self) -> &'static str {
        "oom"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let since = ctx
            .state
            .get_state(LAST_OOM_SCAN)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc));

        let output = ctx.commands.run(&self.command(since)).await?;
        if !output.success() {
            return Err(CheckError::UnexpectedOutput(format!(
                "journalctl exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        let hits = oom_lines(&output.stdout)?;

        // Entries before now are never rescanned, matched or not.
        ctx.state.set_state(
            LAST_OOM_SCAN,
            &ctx.now.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;

        #[allow(clippy::cast_precision_loss)]
        let count = MetricSample::new(OOM_EVENTS, hits.len() as f64, MetricUnit::Count, ctx.now);
        let result = if hits.is_empty() {
            CheckResult::ok(self.name(), "no OOM events in kernel log")
        } else {
            CheckResult::critical(
                self.name(),
                format!("{} OOM event(s) in kernel log:\n{}", hits.len(), excerpt(&hits)),
            )
        };
        Ok(result.with_metrics(vec![count]))
    }
}
