use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CheckContext, CheckError, HealthCheck};
use crate::domain::entities::check_result::{CheckResult, Findings};
use crate::domain::entities::host::{DiskCounters, DiskSnapshot};
use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::store::{get_json_state, set_json_state};
use crate::domain::value_objects::{MetricUnit, Severity};

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLimit {
    pub name: String,
    pub max_iops: f64,
    pub include_reads: bool,
    pub include_writes: bool,
}

impl DeviceLimit {
    /// Sum of the counters this device is configured to watch.
    #[must_use]
    pub fn ops(&self, read_ops: u64, write_ops: u64) -> u64 {
        let reads = if self.include_reads { read_ops } else { 0 };
        let writes = if self.include_writes { write_ops } else { 0 };
        reads.saturating_add(writes)
    }
}

/// Outcome of comparing the current counters with the stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IopsReading {
    /// First observation, counter reset, or no time elapsed
    Baseline,
    OpsPerMinute(f64),
}

/// Operations per minute between two samples of the same device.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ops_per_minute(
    limit: &DeviceLimit,
    previous: Option<&DiskSnapshot>,
    current: DiskCounters,
    now: DateTime<Utc>,
) -> IopsReading {
    let Some(prev) = previous else {
        return IopsReading::Baseline;
    };
    let elapsed_ms = (now - prev.sampled_at).num_milliseconds();
    if elapsed_ms <= 0 {
        return IopsReading::Baseline;
    }
    if current.read_ops < prev.read_ops || current.write_ops < prev.write_ops {
        return IopsReading::Baseline;
    }
    let delta = limit.ops(current.read_ops, current.write_ops)
        - limit.ops(prev.read_ops, prev.write_ops);
    let minutes = elapsed_ms as f64 / 60_000.0;
    IopsReading::OpsPerMinute(delta as f64 / minutes)
}

#[must_use]
pub fn snapshot_key(device: &str) -> String {
    format!("disk_io:{device}")
}

/// Per-device I/O rate between consecutive runs.
pub struct DiskIopsCheck {
    pub devices: Vec<DeviceLimit>,
}

#[async_trait]
impl HealthCheck for DiskIopsCheck {
    fn name(&self) -> &'static str {
        "disk_iops"
    }

    async fn run(&self, ctx: &CheckContext<'_>) -> Result<CheckResult, CheckError> {
        let mut findings = Findings::new();
        if self.devices.is_empty() {
            return Ok(findings.into_result(self.name(), "no disk devices configured"));
        }
        let counters = ctx.collector.disk_counters()?;

        for device in &self.devices {
            let Some(current) = counters.get(&device.name).copied() else {
                findings.push(
                    Severity::Critical,
                    format!("{}: device not found in kernel statistics", device.name),
                );
                continue;
            };
            let key = snapshot_key(&device.name);
            let previous: Option<DiskSnapshot> = get_json_state(ctx.state, &key)?;
            let reading = ops_per_minute(device, previous.as_ref(), current, ctx.now);

            set_json_state(
                ctx.state,
                &key,
                &DiskSnapshot {
                    read_ops: current.read_ops,
                    write_ops: current.write_ops,
                    sampled_at: ctx.now,
                },
            )?;

            match reading {
                IopsReading::Baseline => {
                    findings.push(Severity::Ok, format!("{}: baseline recorded", device.name));
                }
                IopsReading::OpsPerMinute(rate) => {
                    findings.metric(MetricSample::new(
                        format!("disk_iops:{}", device.name),
                        rate,
                        MetricUnit::OpsPerMinute,
                        ctx.now,
                    ));
                    if rate > device.max_iops {
                        findings.push(
                            Severity::Critical,
                            format!(
                                "{}: {rate:.0} ops/min exceeds {:.0}",
                                device.name, device.max_iops
                            ),
                        );
                    } else {
                        findings.push(Severity::Ok, format!("{}: {rate:.0} ops/min", device.name));
                    }
                }
            }
        }
        Ok(findings.into_result(self.name(), "no disk devices configured"))
    }
}
