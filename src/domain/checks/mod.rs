pub mod database;
pub mod disk_iops;
pub mod disk_space;
pub mod docker;
pub mod health_endpoint;
pub mod load;
pub mod logs;
pub mod memory;
pub mod oom;
pub mod reboot;

#[cfg(test)]
pub(crate) mod testing;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use thiserror::Error;

use crate::domain::entities::check_result::CheckResult;
use crate::domain::ports::{
    CollectionError, CommandError, CommandRunner, HostCollector, MetricStore, NetworkError,
    NetworkClient, StateStore, StoreError,
};

pub use database::{DatabaseCheck, DatabaseTarget};
pub use disk_iops::{DeviceLimit, DiskIopsCheck};
pub use disk_space::{DiskSpaceCheck, MountLimit};
pub use docker::{ContainerTarget, ContainersCheck, DockerDaemonCheck};
pub use health_endpoint::HealthEndpointCheck;
pub use load::LoadCheck;
pub use logs::{LogTailCheck, LogTarget};
pub use memory::MemoryCheck;
pub use oom::OomCheck;
pub use reboot::RebootCheck;

/// Why a check could not produce a verdict of its own.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),
}

/// Everything a check may read or write during one run.
pub struct CheckContext<'a> {
    pub metrics: &'a dyn MetricStore,
    pub state: &'a dyn StateStore,
    pub collector: &'a dyn HostCollector,
    pub commands: &'a dyn CommandRunner,
    pub network: &'a dyn NetworkClient,
    /// Single timestamp shared by every sample of the run
    pub now: DateTime<Utc>,
}

/// One category of host or application check.
///
/// A check reads live state through the context ports, reads and updates its
/// own state keys, and returns its verdict along with the samples to persist.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Stable name used in reports and as the result's `check_name`.
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns `CheckError` when the check cannot reach a verdict; the runner
    /// turns that into a CRIT result.
    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError>;
}

/// Runs checks one after another, isolating each one's failure.
pub struct CheckRunner {
    checks: Vec<Box<dyn HealthCheck>>,
}

impl CheckRunner {
    #[must_use]
    pub fn new(checks: Vec<Box<dyn HealthCheck>>) -> Self {
        Self { checks }
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Exactly one result per check, in order. Errors and panics become CRIT results.
    pub async fn run_all(&self, ctx: &CheckContext<'_>) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let name = check.name();
            tracing::debug!(check = name, "running check");
            let outcome = AssertUnwindSafe(check.run(ctx)).catch_unwind().await;
            let result = match outcome {
                Ok(Ok(mut result)) => {
                    result.check_name = name.to_string();
                    result
                }
                Ok(Err(e)) => {
                    tracing::warn!(check = name, "check failed: {e}");
                    CheckResult::collection_failure(name, &e.to_string())
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    tracing::error!(check = name, "check panicked: {reason}");
                    CheckResult::collection_failure(name, &format!("panicked: {reason}"))
                }
            };
            tracing::info!(check = name, severity = %result.severity, "check finished");
            results.push(result);
        }
        results
    }
}

const EXCERPT_LINES: usize = 5;
const EXCERPT_LINE_CHARS: usize = 200;

/// The last few matching lines, each cut to a bounded length.
pub(crate) fn excerpt(lines: &[&str]) -> String {
    let start = lines.len().saturating_sub(EXCERPT_LINES);
    lines[start..]
        .iter()
        .map(|line| {
            let line = line.trim_end();
            if line.chars().count() > EXCERPT_LINE_CHARS {
                let cut: String = line.chars().take(EXCERPT_LINE_CHARS).collect();
                format!("{cut}…")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
