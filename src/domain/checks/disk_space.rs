use std::path::PathBuf;

use async_trait::async_trait;

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::{CheckResult, Findings};
use crate::domain::entities::host::FilesystemUsage;
use crate::domain::entities::metric::MetricSample;
use crate::domain::value_objects::{MetricUnit, Severity};

#[derive(Debug, Clone, PartialEq)]
pub struct MountLimit {
    pub name: String,
    pub path: PathBuf,
    pub warn_percent: f64,
    pub critical_percent: f64,
    pub min_free_gb: f64,
}

impl MountLimit {
    /// The free-space floor and the critical ceiling both win over the warn level.
    #[must_use]
    pub fn classify(&self, usage: &FilesystemUsage) -> Severity {
        let used = usage.used_percent();
        if usage.free_gib() < self.min_free_gb || used >= self.critical_percent {
            Severity::Critical
        } else if used > self.warn_percent {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

pub struct DiskSpaceCheck {
    pub mounts: Vec<MountLimit>,
}

#[async_trait]
impl HealthCheck for DiskSpaceCheck {
    fn name(&self) -> &'static str {
        "disk_space"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let mut findings = Findings::new();
        for mount in &self.mounts {
            let usage = match ctx.collector.filesystem_usage(&mount.path) {
                Ok(usage) => usage,
                Err(e) => {
                    findings.metric(MetricSample::status(
                        format!("disk_ok:{}", mount.name),
                        false,
                        ctx.now,
                    ));
                    findings.push(Severity::Critical, format!("{}: {e}", mount.name));
                    continue;
                }
            };
            let used = usage.used_percent();
            let free = usage.free_gib();
            let severity = mount.classify(&usage);

            findings.metric(MetricSample::new(
                format!("disk_used_percent:{}", mount.name),
                used,
                MetricUnit::Percent,
                ctx.now,
            ));
            findings.metric(MetricSample::new(
                format!("disk_free_gib:{}", mount.name),
                free,
                MetricUnit::Gibibytes,
                ctx.now,
            ));
            findings.metric(MetricSample::status(
                format!("disk_ok:{}", mount.name),
                severity == Severity::Ok,
                ctx.now,
            ));

            let detail = format!(
                "{} ({}): {used:.1}% used, {free:.1} GiB free",
                mount.name,
                mount.path.display()
            );
            let line = match severity {
                Severity::Critical if free < mount.min_free_gb => {
                    format!("{detail} (below {:.1} GiB floor)", mount.min_free_gb)
                }
                Severity::Critical => format!("{detail} (over {:.0}%)", mount.critical_percent),
                Severity::Warning => format!("{detail} (over {:.0}%)", mount.warn_percent),
                Severity::Ok => detail,
            };
            findings.push(severity, line);
        }
        Ok(findings.into_result(self.name(), "no mounts configured"))
    }
}
