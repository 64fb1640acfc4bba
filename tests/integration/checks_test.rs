#![allow(clippy::expect_used)]

mod support;

use std::io::Write;

use chrono::Duration;
use tempfile::TempDir;

use hostwatch::domain::checks::disk_iops::snapshot_key;
use hostwatch::domain::checks::logs::offset_key;
use hostwatch::domain::checks::{
    DeviceLimit, DiskIopsCheck, DiskSpaceCheck, HealthCheck, LogTailCheck, LogTarget, MemoryCheck,
    MountLimit, RebootCheck,
};
use hostwatch::domain::entities::check_result::CheckResult;
use hostwatch::domain::entities::host::MemoryReading;
use hostwatch::domain::ports::store::{MetricStore, StateStore};
use hostwatch::domain::value_objects::Severity;
use hostwatch::infrastructure::persistence::sqlite_store::SqliteStore;

use support::{at, context, usage_gib, StubCommands, StubNetwork, StubCollector};

struct Host {
    _dir: TempDir,
    db: std::path::PathBuf,
    collector: StubCollector,
    commands: StubCommands,
    network: StubNetwork,
}

impl Host {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let db = dir.path().join("state.db");
        Self {
            _dir: dir,
            db,
            collector: StubCollector::healthy(),
            commands: StubCommands::default(),
            network: StubNetwork::default(),
        }
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::open(&self.db).expect("open store")
    }

    async fn run(
        &self,
        store: &SqliteStore,
        check: &dyn HealthCheck,
        now: chrono::DateTime<chrono::Utc>,
    ) -> CheckResult {
        let ctx = context(store, &self.collector, &self.commands, &self.network, now);
        check.run(&ctx).await.expect("check runs")
    }
}

fn metric(result: &CheckResult, name: &str) -> Option<f64> {
    result
        .metrics
        .iter()
        .find(|m| m.name == name)
        .map(|m| m.value)
}

fn device(name: &str) -> DeviceLimit {
    DeviceLimit {
        name: name.into(),
        max_iops: 1000.0,
        include_reads: true,
        include_writes: true,
    }
}

// ---------------------------------------------------------------------------
// Disk IOPS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_device_is_baselined_then_rated() {
    let host = Host::new();
    let store = host.store();
    let check = DiskIopsCheck {
        devices: vec![device("sda")],
    };
    let t0 = at(2026, 3, 1, 12);

    host.collector.set_disk("sda", 5_000, 1_000);
    let first = host.run(&store, &check, t0).await;
    assert_eq!(first.severity, Severity::Ok);
    assert!(first.message.contains("baseline"));
    assert!(metric(&first, "disk_iops:sda").is_none());
    assert!(store
        .get_state(&snapshot_key("sda"))
        .expect("state")
        .is_some());

    host.collector.set_disk("sda", 5_400, 1_200);
    let second = host.run(&store, &check, t0 + Duration::minutes(10)).await;
    let rate = metric(&second, "disk_iops:sda").expect("rate recorded");
    assert!((rate - 60.0).abs() < 1e-9);
    assert_eq!(second.severity, Severity::Ok);
}

#[tokio::test]
async fn doubling_elapsed_time_halves_the_rate() {
    let host = Host::new();
    let store = host.store();
    let t0 = at(2026, 3, 1, 12);

    let short = DiskIopsCheck {
        devices: vec![device("sda")],
    };
    let long = DiskIopsCheck {
        devices: vec![device("sdb")],
    };
    host.collector.set_disk("sda", 0, 0);
    host.collector.set_disk("sdb", 0, 0);
    host.run(&store, &short, t0).await;
    host.run(&store, &long, t0).await;

    host.collector.set_disk("sda", 600, 0);
    host.collector.set_disk("sdb", 600, 0);
    let fast = host.run(&store, &short, t0 + Duration::minutes(10)).await;
    let slow = host.run(&store, &long, t0 + Duration::minutes(20)).await;

    let fast = metric(&fast, "disk_iops:sda").expect("rate");
    let slow = metric(&slow, "disk_iops:sdb").expect("rate");
    assert!(slow >= 0.0);
    assert!((fast - 2.0 * slow).abs() < 1e-9);
}

#[tokio::test]
async fn busy_device_is_critical_and_snapshot_still_advances() {
    let host = Host::new();
    let store = host.store();
    let check = DiskIopsCheck {
        devices: vec![device("nvme0n1")],
    };
    let t0 = at(2026, 3, 1, 12);

    host.collector.set_disk("nvme0n1", 0, 0);
    host.run(&store, &check, t0).await;
    host.collector.set_disk("nvme0n1", 30_000, 30_000);
    let result = host.run(&store, &check, t0 + Duration::minutes(1)).await;

    assert_eq!(result.severity, Severity::Critical);
    assert!(result.message.contains("exceeds 1000"));
    let stored = store
        .get_state(&snapshot_key("nvme0n1"))
        .expect("state")
        .expect("snapshot");
    assert!(stored.contains("30000"));
}

// ---------------------------------------------------------------------------
// Log tailing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn log_offset_is_idempotent_and_follows_rotation() {
    let host = Host::new();
    let store = host.store();
    let logs = TempDir::new().expect("tempdir");
    let path = logs.path().join("app.log");
    std::fs::write(&path, "started\nTraceback (most recent call last):\n  boom\n")
        .expect("write log");
    let target = LogTarget {
        path: path.clone(),
        pattern: "Traceback".into(),
    };
    let check = LogTailCheck::new(vec![target.clone()]);
    let t0 = at(2026, 3, 1, 12);

    let first = host.run(&store, &check, t0).await;
    assert_eq!(first.severity, Severity::Critical);
    assert!(first.message.contains("Traceback (most recent call last):"));
    let offset_after_first = store.get_state(&offset_key(&target.path)).expect("state");

    let second = host.run(&store, &check, t0 + Duration::minutes(5)).await;
    assert_eq!(second.severity, Severity::Ok);
    assert_eq!(
        metric(&second, &format!("log_matches:{}", path.display())),
        Some(0.0)
    );
    assert_eq!(
        store.get_state(&offset_key(&target.path)).expect("state"),
        offset_after_first
    );

    // Rotate: the old file keeps its inode under a new name.
    std::fs::rename(&path, logs.path().join("app.log.1")).expect("rotate");
    let mut fresh = std::fs::File::create(&path).expect("create");
    writeln!(fresh, "Traceback again").expect("write");
    drop(fresh);

    let third = host.run(&store, &check, t0 + Duration::minutes(10)).await;
    assert_eq!(third.severity, Severity::Critical);
    assert!(third.message.contains("Traceback again"));
}

#[tokio::test]
async fn appended_lines_only_are_scanned() {
    let host = Host::new();
    let store = host.store();
    let logs = TempDir::new().expect("tempdir");
    let path = logs.path().join("worker.log");
    std::fs::write(&path, "ERROR old failure\n").expect("write log");
    let check = LogTailCheck::new(vec![LogTarget {
        path: path.clone(),
        pattern: "ERROR|FATAL".into(),
    }]);
    let t0 = at(2026, 3, 1, 12);
    host.run(&store, &check, t0).await;

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open");
    writeln!(file, "info fine\nFATAL new failure").expect("append");
    drop(file);

    let result = host.run(&store, &check, t0 + Duration::minutes(5)).await;
    assert_eq!(result.severity, Severity::Critical);
    assert!(result.message.contains("FATAL new failure"));
    assert!(!result.message.contains("old failure"));
}

#[tokio::test]
async fn two_patterns_on_one_file_alert_and_persist_cleanly() {
    let host = Host::new();
    let store = host.store();
    let logs = TempDir::new().expect("tempdir");
    let path = logs.path().join("app.log");
    std::fs::write(&path, "started\n").expect("write log");
    let check = LogTailCheck::new(vec![
        LogTarget {
            path: path.clone(),
            pattern: "Traceback".into(),
        },
        LogTarget {
            path: path.clone(),
            pattern: "FATAL".into(),
        },
    ]);
    let t0 = at(2026, 3, 1, 12);
    let baseline = host.run(&store, &check, t0).await;
    for sample in &baseline.metrics {
        store.record_metric(sample).expect("baseline sample stored");
    }

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open");
    writeln!(file, "FATAL: db gone").expect("append");
    drop(file);

    let result = host.run(&store, &check, t0 + Duration::minutes(5)).await;
    assert_eq!(result.severity, Severity::Critical);
    assert!(result.message.contains("FATAL: db gone"));
    assert_eq!(result.metrics.len(), 1);
    for sample in &result.metrics {
        store.record_metric(sample).expect("sample stored");
    }
}

// ---------------------------------------------------------------------------
// Reboot detection across process restarts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reboot_is_detected_after_store_reopen() {
    let host = Host::new();
    let t0 = at(2026, 3, 1, 12);

    {
        let store = host.store();
        let baseline = host.run(&store, &RebootCheck, t0).await;
        assert_eq!(baseline.severity, Severity::Ok);
        assert!(baseline.message.contains("baseline"));
    }

    *host.collector.boot_time.lock().expect("lock") = at(2026, 3, 1, 13);
    {
        let store = host.store();
        let rebooted = host.run(&store, &RebootCheck, t0 + Duration::hours(2)).await;
        assert_eq!(rebooted.severity, Severity::Warning);
        assert!(rebooted.message.contains("unplanned reboot"));
    }

    let store = host.store();
    let steady = host.run(&store, &RebootCheck, t0 + Duration::hours(3)).await;
    assert_eq!(steady.severity, Severity::Ok);
    assert_eq!(metric(&steady, "uptime_seconds"), Some(7200.0));
}

// ---------------------------------------------------------------------------
// Memory and disk space scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn memory_at_97_percent_is_critical() {
    let host = Host::new();
    let store = host.store();
    *host.collector.memory.lock().expect("lock") = MemoryReading {
        total_bytes: 1000,
        available_bytes: 30,
    };
    let check = MemoryCheck {
        critical_percent: 95.0,
    };

    let result = host.run(&store, &check, at(2026, 3, 1, 12)).await;
    assert_eq!(result.severity, Severity::Critical);
    assert!(result.message.contains("97.0%"));
}

fn data_mount() -> MountLimit {
    MountLimit {
        name: "data".into(),
        path: "/data".into(),
        warn_percent: 90.0,
        critical_percent: 100.0,
        min_free_gb: 5.0,
    }
}

#[tokio::test]
async fn mount_over_warn_percent_with_room_is_warning() {
    let host = Host::new();
    let store = host.store();
    host.collector.set_filesystem("/data", usage_gib(500.0, 40.0));
    let check = DiskSpaceCheck {
        mounts: vec![data_mount()],
    };

    let result = host.run(&store, &check, at(2026, 3, 1, 12)).await;
    assert_eq!(result.severity, Severity::Warning);
    let used = metric(&result, "disk_used_percent:data").expect("used percent");
    assert!((used - 92.0).abs() < 1e-6);
}

#[tokio::test]
async fn mount_below_free_floor_is_critical() {
    let host = Host::new();
    let store = host.store();
    host.collector.set_filesystem("/data", usage_gib(25.0, 2.0));
    let check = DiskSpaceCheck {
        mounts: vec![data_mount()],
    };

    let result = host.run(&store, &check, at(2026, 3, 1, 12)).await;
    assert_eq!(result.severity, Severity::Critical);
    assert!(result.message.contains("floor"));
    assert_eq!(metric(&result, "disk_ok:data"), Some(0.0));
}
