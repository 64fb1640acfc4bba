//! In-process fakes for the check ports.
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::CheckContext;
use crate::domain::entities::host::{
    DiskCounters, FileIdentity, FilesystemUsage, LoadAverage, MemoryReading,
};
use crate::domain::ports::{
    CollectionError, CommandError, CommandOutput, CommandRunner, CommandSpec, HostCollector,
    HttpResponse, NetworkError, NetworkClient,
};
use crate::infrastructure::persistence::in_memory_store::InMemoryStore;

pub struct FakeCollector {
    pub load: LoadAverage,
    pub cores: usize,
    pub memory: MemoryReading,
    pub boot_time: DateTime<Utc>,
    pub disks: HashMap<String, DiskCounters>,
    pub filesystems: HashMap<PathBuf, FilesystemUsage>,
}

impl Default for FakeCollector {
    fn default() -> Self {
        Self {
            load: LoadAverage {
                one: 0.5,
                five: 0.4,
                fifteen: 0.3,
            },
            cores: 4,
            memory: MemoryReading {
                total_bytes: 1000,
                available_bytes: 500,
            },
            boot_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            disks: HashMap::new(),
            filesystems: HashMap::new(),
        }
    }
}

impl HostCollector for FakeCollector {
    fn load_average(&self) -> Result<LoadAverage, CollectionError> {
        Ok(self.load)
    }

    fn cpu_cores(&self) -> usize {
        self.cores
    }

    fn memory(&self) -> Result<MemoryReading, CollectionError> {
        Ok(self.memory)
    }

    fn boot_time(&self) -> Result<DateTime<Utc>, CollectionError> {
        Ok(self.boot_time)
    }

    fn disk_counters(&self) -> Result<HashMap<String, DiskCounters>, CollectionError> {
        Ok(self.disks.clone())
    }

    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, CollectionError> {
        self.filesystems
            .get(path)
            .copied()
            .ok_or_else(|| CollectionError::NotFound(path.display().to_string()))
    }

    fn file_identity(&self, path: &Path) -> Result<FileIdentity, CollectionError> {
        let meta = std::fs::metadata(path)
            .map_err(|_| CollectionError::NotFound(path.display().to_string()))?;
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
        let bytes = std::fs::read(path)
            .map_err(|e| CollectionError::MetricsUnavailable(e.to_string()))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
        let end = start
            .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
            .min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Output { code: i32, stdout: String },
    Missing,
    Timeout,
}

impl Reply {
    pub fn ok(stdout: &str) -> Self {
        Self::Output {
            code: 0,
            stdout: stdout.to_string(),
        }
    }

    pub fn exit(code: i32, stdout: &str) -> Self {
        Self::Output {
            code,
            stdout: stdout.to_string(),
        }
    }
}

/// Replies keyed by the full command line; unknown commands are "not found".
#[derive(Default)]
pub struct FakeCommands {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeCommands {
    #[allow(clippy::expect_used)]
    pub fn reply(&self, command_line: &str, reply: Reply) {
        self.replies
            .lock()
            .expect("lock")
            .insert(command_line.to_string(), reply);
    }

    #[allow(clippy::expect_used)]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CommandRunner for FakeCommands {
    #[allow(clippy::expect_used)]
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.lock().expect("lock").push(spec.clone());
        let reply = self.replies.lock().expect("lock").get(&spec.display()).cloned();
        match reply {
            Some(Reply::Output { code, stdout }) => Ok(CommandOutput {
                exit_code: Some(code),
                stdout,
                stderr: String::new(),
            }),
            Some(Reply::Timeout) => Err(CommandError::Timeout {
                program: spec.program.clone(),
                secs: spec.timeout.as_secs(),
            }),
            Some(Reply::Missing) | None => Err(CommandError::NotFound(spec.program.clone())),
        }
    }
}

#[derive(Default)]
pub struct FakeNetwork {
    /// `None` makes every GET unreachable
    pub http: Option<HttpResponse>,
    pub open_ports: Vec<u16>,
}

#[async_trait]
impl NetworkClient for FakeNetwork {
    async fn http_get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, NetworkError> {
        self.http
            .clone()
            .ok_or_else(|| NetworkError::Unreachable(url.to_string()))
    }

    async fn tcp_connect(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), NetworkError> {
        if self.open_ports.contains(&port) {
            Ok(())
        } else if host == "10.255.255.1" {
            Err(NetworkError::Timeout(timeout))
        } else {
            Err(NetworkError::Unreachable(format!("{host}:{port}")))
        }
    }
}

/// Owns one of each fake and lends them out as a [`CheckContext`].
pub struct Harness {
    pub store: InMemoryStore,
    pub collector: FakeCollector,
    pub commands: FakeCommands,
    pub network: FakeNetwork,
    pub now: DateTime<Utc>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            collector: FakeCollector::default(),
            commands: FakeCommands::default(),
            network: FakeNetwork::default(),
            now: Utc
                .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    pub fn ctx(&self) -> CheckContext<'_> {
        CheckContext {
            metrics: &self.store,
            state: &self.store,
            collector: &self.collector,
            commands: &self.commands,
            network: &self.network,
            now: self.now,
        }
    }

    pub fn advance(&mut self, by: chrono::Duration) {
        self.now += by;
    }
}
