use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::host::{
    DiskCounters, FileIdentity, FilesystemUsage, LoadAverage, MemoryReading,
};

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("failed to collect system metrics: {0}")]
    MetricsUnavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("path not found: {0}")]
    NotFound(String),
}

/// Read access to live kernel/OS state.
pub trait HostCollector: Send + Sync {
    /// # Errors
    ///
    /// Returns `CollectionError` if the load averages cannot be read.
    fn load_average(&self) -> Result<LoadAverage, CollectionError>;

    /// Number of logical CPUs, at least 1.
    fn cpu_cores(&self) -> usize;

    /// # Errors
    ///
    /// Returns `CollectionError` if memory statistics cannot be read.
    fn memory(&self) -> Result<MemoryReading, CollectionError>;

    /// When the running kernel booted.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the boot time is unavailable.
    fn boot_time(&self) -> Result<DateTime<Utc>, CollectionError>;

    /// Cumulative I/O counters keyed by block device name.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the device statistics cannot be read.
    fn disk_counters(&self) -> Result<HashMap<String, DiskCounters>, CollectionError>;

    /// Capacity figures of the filesystem holding `path`.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::NotFound` if the path does not exist.
    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, CollectionError>;

    /// Device/inode fingerprint and length of a regular file.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::NotFound` if the file does not exist.
    fn file_identity(&self, path: &Path) -> Result<FileIdentity, CollectionError>;

    /// Bytes from `offset` towards the end of the file, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the file cannot be opened or read.
    fn read_file_from(
        &self,
        path: &Path,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, CollectionError>;
}
