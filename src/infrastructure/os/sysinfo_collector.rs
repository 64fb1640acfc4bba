use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::statvfs::statvfs;
use sysinfo::System;

use crate::domain::entities::host::{
    DiskCounters, FileIdentity, FilesystemUsage, LoadAverage, MemoryReading,
};
use crate::domain::ports::collector::{CollectionError, HostCollector};

const DISKSTATS_PATH: &str = "/proc/diskstats";

/// Reads live host state through `sysinfo`, procfs and `statvfs`.
///
/// `sysinfo::System` needs `&mut self` to refresh, hence the mutex.
pub struct SysinfoCollector {
    sys: Mutex<System>,
    diskstats: PathBuf,
}

impl SysinfoCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            diskstats: PathBuf::from(DISKSTATS_PATH),
        }
    }

    /// Reads device counters from another file; used by tests.
    #[must_use]
    pub fn with_diskstats(mut self, path: impl Into<PathBuf>) -> Self {
        self.diskstats = path.into();
        self
    }
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Completed read and write operations per device from `/proc/diskstats`.
///
/// Fields are `major minor name reads_completed reads_merged sectors_read
/// ms_reading writes_completed ...`; short or malformed lines are skipped.
#[must_use]
pub fn parse_diskstats(content: &str) -> HashMap<String, DiskCounters> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 14 {
                return None;
            }
            let read_ops = fields[3].parse().ok()?;
            let write_ops = fields[7].parse().ok()?;
            Some((
                fields[2].to_string(),
                DiskCounters {
                    read_ops,
                    write_ops,
                },
            ))
        })
        .collect()
}

fn map_io(path: &Path, e: &std::io::Error) -> CollectionError {
    match e.kind() {
        std::io::ErrorKind::NotFound => CollectionError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            CollectionError::PermissionDenied(path.display().to_string())
        }
        _ => CollectionError::MetricsUnavailable(format!("{}: {e}", path.display())),
    }
}

impl HostCollector for SysinfoCollector {
    fn load_average(&self) -> Result<LoadAverage, CollectionError> {
        let load = System::load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    fn cpu_cores(&self) -> usize {
        let counted = self.sys.lock().map_or(0, |mut sys| {
            sys.refresh_cpu_all();
            sys.cpus().len()
        });
        if counted > 0 {
            return counted;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }

    fn memory(&self) -> Result<MemoryReading, CollectionError> {
        let mut sys = self.sys.lock().map_err(|e| {
            CollectionError::MetricsUnavailable(format!("system lock poisoned: {e}"))
        })?;
        sys.refresh_memory();
        let reading = MemoryReading {
            total_bytes: sys.total_memory(),
            available_bytes: sys.available_memory(),
        };
        drop(sys);
        if reading.total_bytes == 0 {
            return Err(CollectionError::MetricsUnavailable(
                "total memory reported as zero".into(),
            ));
        }
        Ok(reading)
    }

    fn boot_time(&self) -> Result<DateTime<Utc>, CollectionError> {
        let secs = i64::try_from(System::boot_time())
            .map_err(|e| CollectionError::MetricsUnavailable(e.to_string()))?;
        DateTime::from_timestamp(secs, 0)
            .filter(|_| secs > 0)
            .ok_or_else(|| CollectionError::MetricsUnavailable("boot time unavailable".into()))
    }

    fn disk_counters(&self) -> Result<HashMap<String, DiskCounters>, CollectionError> {
        let content =
            std::fs::read_to_string(&self.diskstats).map_err(|e| map_io(&self.diskstats, &e))?;
        Ok(parse_diskstats(&content))
    }

    #[allow(clippy::useless_conversion)]
    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, CollectionError> {
        let stat = statvfs(path).map_err(|errno| match errno {
            Errno::ENOENT => CollectionError::NotFound(path.display().to_string()),
            Errno::EACCES => CollectionError::PermissionDenied(path.display().to_string()),
            other => CollectionError::MetricsUnavailable(format!("{}: {other}", path.display())),
        })?;
        let block = u64::from(stat.fragment_size());
        let total = u64::from(stat.blocks()).saturating_mul(block);
        let free_all = u64::from(stat.blocks_free()).saturating_mul(block);
        let available = u64::from(stat.blocks_available()).saturating_mul(block);
        Ok(FilesystemUsage {
            total_bytes: total,
            used_bytes: total.saturating_sub(free_all),
            free_bytes: available,
        })
    }

    fn file_identity(&self, path: &Path) -> Result<FileIdentity, CollectionError> {
        let meta = std::fs::metadata(path).map_err(|e| map_io(path, &e))?;
        Ok(FileIdentity {
            fingerprint: (meta.dev(), meta.ino()),
            len: meta.len(),
        })
    }

    fn read_file_from(
        &self,
        path: &Path,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, CollectionError> {
        let mut file = File::open(path).map_err(|e| map_io(path, &e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| map_io(path, &e))?;
        let mut buf = Vec::new();
        file.take(limit)
            .read_to_end(&mut buf)
            .map_err(|e| map_io(path, &e))?;
        Ok(buf)
    }
}
