use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use super::dispatcher::{DispatchSummary, NotificationDispatcher, PollSummary};
use super::evaluator::{evaluate, test_message, RunReport};
use crate::domain::checks::{CheckContext, CheckRunner};
use crate::domain::entities::check_result::CheckResult;
use crate::domain::value_objects::{RunMode, Severity};

const PERSISTENCE_CHECK: &str = "metric_persistence";

/// Process exit status when the run could not happen at all.
pub const EXIT_NOT_RUN: u8 = 3;

/// Receives the full report before any notification goes out.
pub trait ReportSink {
    fn publish(&self, report: &RunReport);
}

/// Run-wide settings taken from configuration.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub host: String,
    pub retention_days: u32,
    /// Refresh subscribers before dispatching a notify run
    pub poll_before_notify: bool,
}

#[derive(Debug)]
pub enum RunOutcome {
    Checked {
        report: RunReport,
        delivery: Option<DispatchSummary>,
    },
    TestNotified(DispatchSummary),
    Polled(PollSummary),
}

impl RunOutcome {
    /// 0 OK, 1 WARN or incomplete test delivery, 2 CRIT.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Checked { report, .. } => match report.overall {
                Severity::Ok => 0,
                Severity::Warning => 1,
                Severity::Critical => 2,
            },
            Self::TestNotified(summary) => u8::from(!summary.fully_delivered()),
            Self::Polled(_) => 0,
        }
    }
}

/// Orchestrates one invocation: collect → persist → evaluate → report → notify.
pub struct RunOrchestrator<'a> {
    runner: &'a CheckRunner,
    dispatcher: Option<&'a NotificationDispatcher<'a>>,
    sink: &'a dyn ReportSink,
    settings: RunSettings,
}

impl<'a> RunOrchestrator<'a> {
    #[must_use]
    pub const fn new(
        runner: &'a CheckRunner,
        dispatcher: Option<&'a NotificationDispatcher<'a>>,
        sink: &'a dyn ReportSink,
        settings: RunSettings,
    ) -> Self {
        Self {
            runner,
            dispatcher,
            sink,
            settings,
        }
    }

    /// Execute `mode`. Collecting modes need `ctx`; the others need a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error when the mode's prerequisites are missing or inbound
    /// polling fails in poll-only mode. Check failures are never errors.
    pub async fn run(
        &self,
        mode: RunMode,
        ctx: Option<&CheckContext<'_>>,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        tracing::info!(mode = %mode, host = %self.settings.host, "run started");
        match mode {
            RunMode::Collect | RunMode::Notify => {
                let Some(ctx) = ctx else {
                    bail!("{mode} run needs an open state store");
                };
                let report = self.collect(ctx).await;
                self.sink.publish(&report);
                let delivery = if mode == RunMode::Notify {
                    self.notify(&report, ctx.now).await
                } else {
                    None
                };
                Ok(RunOutcome::Checked { report, delivery })
            }
            RunMode::TestNotify => {
                let Some(dispatcher) = self.dispatcher else {
                    bail!("test notification needs a configured notification channel");
                };
                let summary = dispatcher
                    .broadcast(&test_message(&self.settings.host, now))
                    .await;
                Ok(RunOutcome::TestNotified(summary))
            }
            RunMode::PollOnly => {
                let Some(dispatcher) = self.dispatcher else {
                    bail!("polling needs a configured notification channel");
                };
                Ok(RunOutcome::Polled(dispatcher.poll_subscribers(now).await?))
            }
        }
    }

    /// Prune, run every check, persist samples and evaluate.
    pub async fn collect(&self, ctx: &CheckContext<'_>) -> RunReport {
        let cutoff = ctx.now - chrono::Duration::days(i64::from(self.settings.retention_days));
        match ctx.metrics.prune_older_than(cutoff) {
            Ok(0) => {}
            Ok(n) => tracing::info!(removed = n, "pruned samples past retention"),
            Err(e) => tracing::warn!("retention pruning failed: {e}"),
        }

        let mut results = self.runner.run_all(ctx).await;
        if let Some(failure) = persist_metrics(ctx, &results) {
            results.push(failure);
        }

        let report = evaluate(&self.settings.host, ctx.now, results);
        tracing::info!(
            overall = %report.overall,
            checks = report.results.len(),
            alerting = report.alerting().count(),
            "run evaluated"
        );
        report
    }

    async fn notify(&self, report: &RunReport, now: DateTime<Utc>) -> Option<DispatchSummary> {
        let Some(dispatcher) = self.dispatcher else {
            if report.should_alert() {
                tracing::warn!("no notification channel configured, alert not sent");
            }
            return None;
        };
        if self.settings.poll_before_notify {
            if let Err(e) = dispatcher.poll_subscribers(now).await {
                tracing::warn!("subscriber refresh failed: {e:#}");
            }
        }
        if !report.should_alert() {
            tracing::info!("all checks OK, nothing to notify");
            return None;
        }
        let summary = dispatcher.broadcast(&report.to_message()).await;
        tracing::info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed.len(),
            "notification dispatched"
        );
        Some(summary)
    }
}

/// Stores every sample; a failure surfaces as its own CRIT result.
fn persist_metrics(ctx: &CheckContext<'_>, results: &[CheckResult]) -> Option<CheckResult> {
    let mut failed = 0usize;
    let mut first_error = None;
    for sample in results.iter().flat_map(|r| &r.metrics) {
        if let Err(e) = ctx.metrics.record_metric(sample) {
            tracing::warn!(metric = %sample.name, "failed to persist sample: {e}");
            failed += 1;
            first_error.get_or_insert_with(|| e.to_string());
        }
    }
    first_error.map(|reason| {
        CheckResult::critical(
            PERSISTENCE_CHECK,
            format!("{failed} sample(s) could not be stored: {reason}"),
        )
    })
}
