use std::time::Duration;

use async_trait::async_trait;

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::{CheckResult, Findings};
use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::{CommandError, CommandRunner, CommandSpec};
use crate::domain::value_objects::Severity;

pub const DOCKER_ACTIVE: &str = "docker_active";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    /// `docker inspect` failed; carries its stderr
    Unknown(String),
}

/// `docker inspect -f {{.State.Running}} <container>`.
///
/// # Errors
///
/// Returns `CommandError` if the docker CLI cannot be run at all.
pub async fn container_state(
    commands: &dyn CommandRunner,
    container: &str,
    timeout: Duration,
) -> Result<ContainerState, CommandError> {
    let spec = CommandSpec::new(
        "docker",
        ["inspect", "-f", "{{.State.Running}}", container],
        timeout,
    );
    let output = commands.run(&spec).await?;
    if !output.success() {
        let reason = output.stderr.trim();
        let reason = if reason.is_empty() {
            "no such container"
        } else {
            reason
        };
        return Ok(ContainerState::Unknown(reason.to_string()));
    }
    Ok(if output.text() == "true" {
        ContainerState::Running
    } else {
        ContainerState::Stopped
    })
}

/// Container daemon unit state as reported by systemd.
pub struct DockerDaemonCheck {
    pub service: String,
    pub timeout: Duration,
}

#[async_trait]
impl HealthCheck for DockerDaemonCheck {
    fn name(&self) -> &'static str {
        "docker_daemon"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let spec = CommandSpec::new("systemctl", ["is-active", self.service.as_str()], self.timeout);
        // A non-zero exit is how systemctl reports "inactive", so only stdout matters.
        let output = ctx.commands.run(&spec).await?;
        let state = output.text();
        let active = state == "active";
        let metric = MetricSample::status(DOCKER_ACTIVE, active, ctx.now);

        let result = if active {
            CheckResult::ok(self.name(), format!("{} is active", self.service))
        } else {
            let state = if state.is_empty() { "unknown" } else { state };
            CheckResult::critical(self.name(), format!("{} is {state}", self.service))
        };
        Ok(result.with_metrics(vec![metric]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    pub container: String,
    pub label: String,
}

pub struct ContainersCheck {
    pub containers: Vec<ContainerTarget>,
    pub timeout: Duration,
}

#[async_trait]
impl HealthCheck for ContainersCheck {
    fn name(&self) -> &'static str {
        "containers"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let mut findings = Findings::new();
        for target in &self.containers {
            let state = match container_state(ctx.commands, &target.container, self.timeout).await {
                Ok(state) => state,
                Err(CommandError::NotFound(bin)) => {
                    return Err(CommandError::NotFound(bin).into());
                }
                Err(e) => ContainerState::Unknown(e.to_string()),
            };
            let running = state == ContainerState::Running;
            findings.metric(MetricSample::status(
                format!("container_running:{}", target.container),
                running,
                ctx.now,
            ));
            match state {
                ContainerState::Running => {
                    findings.push(Severity::Ok, format!("{} running", target.label));
                }
                ContainerState::Stopped => {
                    findings.push(Severity::Critical, format!("{} is not running", target.label));
                }
                ContainerState::Unknown(reason) => findings.push(
                    Severity::Critical,
                    format!("{} could not be inspected: {reason}", target.label),
                ),
            }
        }
        Ok(findings.into_result(self.name(), "no containers configured"))
    }
}
