#![allow(dead_code, clippy::expect_used)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use hostwatch::domain::checks::CheckContext;
use hostwatch::domain::entities::host::{
    DiskCounters, FileIdentity, FilesystemUsage, LoadAverage, MemoryReading, BYTES_PER_GIB,
};
use hostwatch::domain::ports::collector::{CollectionError, HostCollector};
use hostwatch::domain::ports::command::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use hostwatch::domain::ports::network::{HttpResponse, NetworkError, NetworkClient};
use hostwatch::domain::ports::store::{MetricStore, StateStore};
use hostwatch::infrastructure::os::sysinfo_collector::SysinfoCollector;

// ---------------------------------------------------------------------------
// StubCollector: scripted kernel readings, real file access
// ---------------------------------------------------------------------------

pub struct StubCollector {
    pub load: Mutex<LoadAverage>,
    pub cores: usize,
    pub memory: Mutex<MemoryReading>,
    pub boot_time: Mutex<DateTime<Utc>>,
    pub disks: Mutex<HashMap<String, DiskCounters>>,
    pub filesystems: Mutex<HashMap<PathBuf, FilesystemUsage>>,
    files: SysinfoCollector,
}

impl StubCollector {
    pub fn healthy() -> Self {
        Self {
            load: Mutex::new(LoadAverage {
                one: 0.4,
                five: 0.3,
                fifteen: 0.2,
            }),
            cores: 4,
            memory: Mutex::new(MemoryReading {
                total_bytes: 16 * 1024 * 1024 * 1024,
                available_bytes: 10 * 1024 * 1024 * 1024,
            }),
            boot_time: Mutex::new(at(2026, 2, 1, 8)),
            disks: Mutex::new(HashMap::new()),
            filesystems: Mutex::new(HashMap::from([(
                PathBuf::from("/"),
                usage_gib(100.0, 40.0),
            )])),
            files: SysinfoCollector::new(),
        }
    }

    pub fn set_disk(&self, device: &str, read_ops: u64, write_ops: u64) {
        self.disks.lock().expect("lock").insert(
            device.to_string(),
            DiskCounters {
                read_ops,
                write_ops,
            },
        );
    }

    pub fn set_filesystem(&self, path: &str, usage: FilesystemUsage) {
        self.filesystems
            .lock()
            .expect("lock")
            .insert(PathBuf::from(path), usage);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn usage_gib(total: f64, free: f64) -> FilesystemUsage {
    let total_bytes = (total * BYTES_PER_GIB) as u64;
    let free_bytes = (free * BYTES_PER_GIB) as u64;
    FilesystemUsage {
        total_bytes,
        used_bytes: total_bytes - free_bytes,
        free_bytes,
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

impl HostCollector for StubCollector {
    fn load_average(&self) -> Result<LoadAverage, CollectionError> {
        Ok(*self.load.lock().expect("lock"))
    }

    fn cpu_cores(&self) -> usize {
        self.cores
    }

    fn memory(&self) -> Result<MemoryReading, CollectionError> {
        Ok(*self.memory.lock().expect("lock"))
    }

    fn boot_time(&self) -> Result<DateTime<Utc>, CollectionError> {
        Ok(*self.boot_time.lock().expect("lock"))
    }

    fn disk_counters(&self) -> Result<HashMap<String, DiskCounters>, CollectionError> {
        Ok(self.disks.lock().expect("lock").clone())
    }

    fn filesystem_usage(&self, path: &Path) -> Result<FilesystemUsage, CollectionError> {
        self.filesystems
            .lock()
            .expect("lock")
            .get(path)
            .copied()
            .ok_or_else(|| CollectionError::NotFound(path.display().to_string()))
    }

    fn file_identity(&self, path: &Path) -> Result<FileIdentity, CollectionError> {
        self.files.file_identity(path)
    }

    fn read_file_from(
        &self,
        path: &Path,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, CollectionError> {
        self.files.read_file_from(path, offset, limit)
    }
}

// ---------------------------------------------------------------------------
// StubCommands: canned output keyed by command line
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubCommands {
    replies: Mutex<HashMap<String, (i32, String)>>,
    calls: Mutex<Vec<String>>,
}

impl StubCommands {
    pub fn reply(&self, command_line: &str, code: i32, stdout: &str) {
        self.replies
            .lock()
            .expect("lock")
            .insert(command_line.to_string(), (code, stdout.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CommandRunner for StubCommands {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let line = spec.display();
        self.calls.lock().expect("lock").push(line.clone());
        let reply = self.replies.lock().expect("lock").get(&line).cloned();
        match reply {
            Some((code, stdout)) => Ok(CommandOutput {
                exit_code: Some(code),
                stdout,
                stderr: String::new(),
            }),
            None => Err(CommandError::NotFound(spec.program.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// StubNetwork
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubNetwork {
    pub http: Mutex<Option<HttpResponse>>,
    pub open_ports: Vec<u16>,
}

#[async_trait]
impl NetworkClient for StubNetwork {
    async fn http_get(&self, _url: &str, timeout: Duration) -> Result<HttpResponse, NetworkError> {
        self.http
            .lock()
            .expect("lock")
            .clone()
            .ok_or(NetworkError::Timeout(timeout))
    }

    async fn tcp_connect(
        &self,
        host: &str,
        port: u16,
        _timeout: Duration,
    ) -> Result<(), NetworkError> {
        if self.open_ports.contains(&port) {
            Ok(())
        } else {
            Err(NetworkError::Unreachable(format!("{host}:{port} refused")))
        }
    }
}

pub fn context<'a>(
    store: &'a (impl MetricStore + StateStore),
    collector: &'a StubCollector,
    commands: &'a StubCommands,
    network: &'a StubNetwork,
    now: DateTime<Utc>,
) -> CheckContext<'a> {
    CheckContext {
        metrics: store,
        state: store,
        collector,
        commands,
        network,
        now,
    }
}
