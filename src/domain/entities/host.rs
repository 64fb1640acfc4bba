use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1/5/15-minute run-queue averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryReading {
    /// Share of memory in use, in percent. A zero total reads as fully used.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        let available = self.available_bytes.min(self.total_bytes) as f64;
        (1.0 - available / self.total_bytes as f64) * 100.0
    }
}

/// Cumulative I/O operation counters of a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskCounters {
    pub read_ops: u64,
    pub write_ops: u64,
}

/// Stored per-device counter snapshot used to compute deltas between runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub read_ops: u64,
    pub write_ops: u64,
    pub sampled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    /// Space available to unprivileged users
    pub free_bytes: u64,
}

pub const BYTES_PER_GIB: f64 = 1_073_741_824.0;

impl FilesystemUsage {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.total_bytes as f64 * 100.0).clamp(0.0, 100.0)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn free_gib(&self) -> f64 {
        self.free_bytes as f64 / BYTES_PER_GIB
    }
}

/// Identity and resume position of a tailed log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogOffset {
    pub offset: u64,
    /// `(device, inode)` of the file the offset belongs to
    pub fingerprint: Option<(u64, u64)>,
}

/// Identity and current length of a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    pub fingerprint: (u64, u64),
    pub len: u64,
}
