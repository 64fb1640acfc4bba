use std::fmt::Write;

use colored::Colorize;

use crate::application::services::dispatcher::{DispatchSummary, PollSummary};
use crate::application::services::evaluator::RunReport;
use crate::application::services::orchestrator::ReportSink;
use crate::domain::entities::check_result::CheckResult;
use crate::domain::value_objects::Severity;

/// Strips ANSI/OSC escape sequences so collected text cannot drive the terminal.
fn sanitize_terminal(input: &str) -> String {
    input.chars().filter(|c| *c != '\x1b').collect()
}

fn severity_badge(severity: Severity) -> String {
    let label = format!(" {:<4} ", severity.to_string());
    match severity {
        Severity::Critical => format!("{}", label.on_red().white().bold()),
        Severity::Warning => format!("{}", label.on_yellow().black().bold()),
        Severity::Ok => format!("{}", label.on_green().black()),
    }
}

fn format_result(out: &mut String, result: &CheckResult) {
    let _ = writeln!(
        out,
        "{} {}",
        severity_badge(result.severity),
        result.check_name.bold()
    );
    for line in result.message.lines() {
        let line = sanitize_terminal(line);
        if result.severity.is_alert() {
            let _ = writeln!(out, "       {line}");
        } else {
            let _ = writeln!(out, "       {}", line.dimmed());
        }
    }
    if !result.metrics.is_empty() {
        let samples: Vec<String> = result
            .metrics
            .iter()
            .map(|m| format!("{}={}", m.name, m.display_value()))
            .collect();
        let _ = writeln!(out, "       {}", samples.join("  ").dimmed());
    }
}

/// Every check with its outcome, in run order, under a one-line summary.
#[must_use]
pub fn format_report(report: &RunReport) -> String {
    let title = format!(
        "{} hostwatch · {} · {}",
        report.overall.emoji(),
        sanitize_terminal(&report.host),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let mut out = String::new();
    let _ = writeln!(out, "{}", title.bold().cyan());
    let _ = writeln!(out, "{}", "─".repeat(title.chars().count()).cyan());
    for result in &report.results {
        format_result(&mut out, result);
    }
    let _ = writeln!(
        out,
        "\n{} {} ok, {} warn, {} crit",
        "Overall:".bold(),
        report.count(Severity::Ok),
        report.count(Severity::Warning),
        report.count(Severity::Critical),
    );
    out
}

#[must_use]
pub fn format_delivery(summary: &DispatchSummary) -> String {
    let mut out = format!(
        "Notification: {}/{} delivered",
        summary.delivered, summary.attempted
    );
    for (recipient, reason) in &summary.failed {
        let _ = write!(out, "\n  {} {recipient}: {reason}", "✗".red());
    }
    out
}

#[must_use]
pub fn format_poll(summary: &PollSummary) -> String {
    format!(
        "Inbound: {} event(s), {} registered, {} removed, last update id {}",
        summary.events,
        summary.registered.len(),
        summary.removed.len(),
        summary
            .last_update_id
            .map_or_else(|| "none".to_string(), |id| id.to_string())
    )
}

/// Prints the run report to stdout, as text or JSON.
pub struct TerminalReporter {
    json: bool,
    quiet: bool,
}

impl TerminalReporter {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

impl ReportSink for TerminalReporter {
    fn publish(&self, report: &RunReport) {
        if self.quiet {
            return;
        }
        if self.json {
            match serde_json::to_string_pretty(report) {
                Ok(text) => println!("{text}"),
                Err(e) => tracing::error!("failed to serialise report: {e}"),
            }
        } else {
            print!("{}", format_report(report));
        }
    }
}
