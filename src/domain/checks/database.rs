use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::docker::{container_state, ContainerState};
use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::{CheckResult, Findings};
use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::CommandSpec;
use crate::domain::value_objects::{MetricUnit, Severity};

pub const DB_CONTAINER: &str = "db_container_running";
pub const DB_PORT: &str = "db_port_open";
pub const DB_QUERY: &str = "db_query_ok";
pub const DB_LATENCY: &str = "db_query_latency_ms";

#[derive(Debug, Clone)]
pub struct DatabaseTarget {
    pub container: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    /// Resolved from the environment when the check is built
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

/// Container, port and engine checks of a containerised PostgreSQL.
pub struct DatabaseCheck {
    pub target: DatabaseTarget,
}

impl DatabaseCheck {
    fn query_command(&self) -> CommandSpec {
        let t = &self.target;
        let mut args = vec!["exec".to_string()];
        if t.password.is_some() {
            // Forwarded from the docker client's environment; keeps the secret off argv.
            args.extend(["-e".to_string(), "PGPASSWORD".to_string()]);
        }
        args.extend(
            [
                t.container.as_str(),
                "psql",
                "-U",
                t.user.as_str(),
                "-d",
                t.database.as_str(),
                "-tAc",
                "SELECT 1",
            ]
            .map(String::from),
        );
        let spec = CommandSpec::new("docker", args, t.command_timeout);
        match &t.password {
            Some(pw) => spec.with_env("PGPASSWORD", pw),
            None => spec,
        }
    }
}

#[async_trait]
impl HealthCheck for DatabaseCheck {
    fn name(&self) -> &'static str {
        "database"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let t = &self.target;
        let mut findings = Findings::new();

        let container_ok =
            match container_state(ctx.commands, &t.container, t.command_timeout).await {
                Ok(ContainerState::Running) => {
                    findings.push(Severity::Ok, format!("container {} running", t.container));
                    true
                }
                Ok(ContainerState::Stopped) => {
                    findings.push(
                        Severity::Critical,
                        format!("container {} is not running", t.container),
                    );
                    false
                }
                Ok(ContainerState::Unknown(reason)) => {
                    findings.push(
                        Severity::Critical,
                        format!("container {} could not be inspected: {reason}", t.container),
                    );
                    false
                }
                Err(e) => {
                    findings.push(Severity::Critical, format!("container check failed: {e}"));
                    false
                }
            };
        findings.metric(MetricSample::status(DB_CONTAINER, container_ok, ctx.now));

        let port_ok = match ctx
            .network
            .tcp_connect(&t.host, t.port, t.connect_timeout)
            .await
        {
            Ok(()) => {
                findings.push(Severity::Ok, format!("port {}:{} open", t.host, t.port));
                true
            }
            Err(e) => {
                findings.push(
                    Severity::Critical,
                    format!("port {}:{} unreachable: {e}", t.host, t.port),
                );
                false
            }
        };
        findings.metric(MetricSample::status(DB_PORT, port_ok, ctx.now));

        let started = Instant::now();
        let query = ctx.commands.run(&self.query_command()).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let query_ok = match query {
            Ok(out) if out.success() && out.text() == "1" => {
                findings.push(Severity::Ok, format!("query answered in {latency_ms:.0} ms"));
                findings.metric(MetricSample::new(
                    DB_LATENCY,
                    latency_ms,
                    MetricUnit::Milliseconds,
                    ctx.now,
                ));
                true
            }
            Ok(out) => {
                let detail = if out.stderr.trim().is_empty() {
                    format!("unexpected answer {:?}", out.text())
                } else {
                    out.stderr.trim().to_string()
                };
                findings.push(Severity::Critical, format!("query failed: {detail}"));
                false
            }
            Err(e) => {
                findings.push(Severity::Critical, format!("query failed: {e}"));
                false
            }
        };
        findings.metric(MetricSample::status(DB_QUERY, query_ok, ctx.now));

        Ok(findings.into_result(self.name(), "database healthy"))
    }
}
