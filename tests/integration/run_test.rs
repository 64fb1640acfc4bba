#![allow(clippy::expect_used)]

mod support;

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;
use tempfile::TempDir;

use hostwatch::application::config::AppConfig;
use hostwatch::application::services::check_plan::configured_checks;
use hostwatch::application::services::dispatcher::{NotificationDispatcher, SubscriptionCommands};
use hostwatch::application::services::evaluator::RunReport;
use hostwatch::application::services::orchestrator::{
    ReportSink, RunOrchestrator, RunOutcome, RunSettings,
};
use hostwatch::domain::checks::CheckRunner;
use hostwatch::domain::entities::metric::MetricSample;
use hostwatch::domain::ports::network::HttpResponse;
use hostwatch::domain::ports::notifier::{Channel, NotificationError};
use hostwatch::domain::ports::store::MetricStore;
use hostwatch::domain::value_objects::{MetricUnit, RunMode, Severity};
use hostwatch::infrastructure::persistence::sqlite_store::SqliteStore;

use support::{at, context, StubCommands, StubNetwork, StubCollector};

// ---------------------------------------------------------------------------
// Fixture loader
// ---------------------------------------------------------------------------

fn fixture_path(name: &str) -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_config() -> AppConfig {
    AppConfig::load_from(&fixture_path("hostwatch.toml")).expect("fixture config")
}

// ---------------------------------------------------------------------------
// Capturing collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CapturingSink {
    reports: Mutex<Vec<RunReport>>,
}

impl ReportSink for CapturingSink {
    fn publish(&self, report: &RunReport) {
        self.reports.lock().expect("lock").push(report.clone());
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("lock")
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// A healthy host matching the fixture configuration
// ---------------------------------------------------------------------------

const HEALTHY_BODY: &str =
    r#"{"status": "healthy", "version": "1.4.2", "metrics": {"uptime_seconds": 86400}}"#;

struct Host {
    dir: TempDir,
    config: AppConfig,
    collector: StubCollector,
    commands: StubCommands,
    network: StubNetwork,
}

impl Host {
    fn healthy() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let mut config = load_config();
        config.state_path = dir.path().join("state.db").display().to_string();
        let log = dir.path().join("error.log");
        std::fs::write(&log, "worker started\n").expect("write log");
        config.logs[0].path = log.display().to_string();

        let collector = StubCollector::healthy();
        collector.set_disk("sda", 10_000, 5_000);

        let commands = StubCommands::default();
        commands.reply("journalctl -k -n 200 --no-pager", 0, "");
        commands.reply("systemctl is-active docker", 0, "active\n");
        for container in ["app_web_1", "app_worker_1", "app_db_1"] {
            commands.reply(
                &format!("docker inspect -f {{{{.State.Running}}}} {container}"),
                0,
                "true\n",
            );
        }
        commands.reply(
            "docker exec app_db_1 psql -U app -d appdb -tAc SELECT 1",
            0,
            "1\n",
        );

        let network = StubNetwork {
            http: Mutex::new(Some(HttpResponse {
                status: 200,
                body: HEALTHY_BODY.into(),
            })),
            open_ports: vec![5432],
        };

        Self {
            dir,
            config,
            collector,
            commands,
            network,
        }
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::open(&self.config.state_path()).expect("open store")
    }

    fn settings(&self) -> RunSettings {
        RunSettings {
            host: self.config.host_label(),
            retention_days: self.config.retention_days,
            poll_before_notify: false,
        }
    }

    async fn run(
        &self,
        mode: RunMode,
        now: chrono::DateTime<chrono::Utc>,
        dispatcher: Option<&NotificationDispatcher<'_>>,
        sink: &CapturingSink,
    ) -> RunOutcome {
        let store = self.store();
        let runner = CheckRunner::new(configured_checks(&self.config));
        let orchestrator = RunOrchestrator::new(&runner, dispatcher, sink, self.settings());
        let ctx = context(&store, &self.collector, &self.commands, &self.network, now);
        orchestrator.run(mode, Some(&ctx), now).await.expect("run")
    }
}

fn report(outcome: &RunOutcome) -> &RunReport {
    match outcome {
        RunOutcome::Checked { report, .. } => report,
        other => panic!("expected a checked run, got {other:?}"),
    }
}

fn commands() -> SubscriptionCommands {
    SubscriptionCommands {
        subscribe: "/start".into(),
        unsubscribe: "/stop".into(),
        welcome: "welcome".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn fixture_enables_every_check_in_fixed_order() {
    let runner = CheckRunner::new(configured_checks(&load_config()));
    assert_eq!(
        runner.names(),
        vec![
            "load",
            "memory",
            "oom",
            "docker_daemon",
            "containers",
            "database",
            "health_endpoint",
            "logs",
            "reboot",
            "disk_iops",
            "disk_space",
        ]
    );
}

#[tokio::test]
async fn healthy_host_reports_ok_and_persists_samples() {
    let host = Host::healthy();
    let sink = CapturingSink::default();
    let now = at(2026, 3, 1, 12);

    let outcome = host.run(RunMode::Collect, now, None, &sink).await;
    let report = report(&outcome);

    let failing: Vec<_> = report.alerting().map(|r| (&r.check_name, &r.message)).collect();
    assert!(failing.is_empty(), "unexpected alerts: {failing:?}");
    assert_eq!(report.results.len(), 11);
    assert_eq!(report.host, "web-01");
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(sink.reports.lock().expect("lock").len(), 1);

    let store = host.store();
    let memory = store
        .query_metrics("memory_used_percent", now - Duration::hours(1))
        .expect("query");
    assert_eq!(memory.len(), 1);
    let uptime = store
        .query_metrics("app_uptime_seconds", now - Duration::hours(1))
        .expect("query");
    assert!((uptime[0].value - 86_400.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn stopped_container_is_critical_and_notified() {
    let host = Host::healthy();
    let sink = CapturingSink::default();
    let t0 = at(2026, 3, 1, 12);
    host.run(RunMode::Collect, t0, None, &sink).await;

    let t1 = t0 + Duration::minutes(15);
    host.commands.reply(
        &format!("journalctl -k -n 200 --no-pager --since @{}", t0.timestamp()),
        0,
        "",
    );
    host.commands.reply(
        "docker inspect -f {{.State.Running}} app_worker_1",
        0,
        "false\n",
    );
    let channel = RecordingChannel::default();
    let recipients = vec!["111".to_string()];
    let dispatcher = NotificationDispatcher::new(&channel, &recipients, None, commands());

    let outcome = host.run(RunMode::Notify, t1, Some(&dispatcher), &sink).await;

    assert_eq!(outcome.exit_code(), 2);
    let alerting: Vec<&str> = report(&outcome)
        .alerting()
        .map(|r| r.check_name.as_str())
        .collect();
    assert_eq!(alerting, vec!["containers"]);
    let sent = channel.sent.lock().expect("lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "111");
    assert!(sent[0].1.contains("app_worker_1"));
    assert!(sent[0].1.contains("10 other check(s) OK"));
}

#[tokio::test]
async fn unreachable_dependency_is_reported_not_fatal() {
    let host = Host::healthy();
    *host.network.http.lock().expect("lock") = None;
    host.commands.reply("systemctl is-active docker", 3, "inactive\n");
    let sink = CapturingSink::default();

    let outcome = host
        .run(RunMode::Collect, at(2026, 3, 1, 12), None, &sink)
        .await;
    let report = report(&outcome);

    assert_eq!(report.results.len(), 11);
    assert_eq!(report.overall, Severity::Critical);
    let health = report
        .results
        .iter()
        .find(|r| r.check_name == "health_endpoint")
        .expect("health result");
    assert!(health.message.contains("unreachable"));
    let docker = report
        .results
        .iter()
        .find(|r| r.check_name == "docker_daemon")
        .expect("docker result");
    assert_eq!(docker.severity, Severity::Critical);
}

#[tokio::test]
async fn samples_past_retention_are_pruned_on_each_run() {
    let host = Host::healthy();
    let now = at(2026, 3, 1, 12);
    {
        let store = host.store();
        for days in [400, 366, 300] {
            store
                .record_metric(&MetricSample::new(
                    "loadavg_1m",
                    0.1,
                    MetricUnit::Load,
                    now - Duration::days(days),
                ))
                .expect("seed");
        }
    }

    let sink = CapturingSink::default();
    host.run(RunMode::Collect, now, None, &sink).await;

    let store = host.store();
    let kept = store
        .query_metrics("loadavg_1m", now - Duration::days(3650))
        .expect("query");
    assert_eq!(kept.len(), 2);
    assert!(kept
        .iter()
        .all(|s| s.recorded_at >= now - Duration::days(365)));
    assert!(host.dir.path().join("state.db").exists());
}
