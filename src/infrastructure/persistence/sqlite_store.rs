use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::store::{MetricStore, StateStore, StoreError};
use crate::domain::value_objects::MetricUnit;

use super::migrations;

/// SQLite-backed store for metric samples and keyed state.
///
/// Every statement commits on its own, so a crash mid-run keeps everything
/// written before it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamps, so text comparison orders them correctly.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    ///
    /// Creates parent directories, sets WAL mode and pragmas, and initializes schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::prepare(conn)
    }

    /// In-memory database with the same schema, for tests.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        migrations::initialize_schema(&conn)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetricStore for SqliteStore {
    fn record_metric(&self, sample: &MetricSample) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        conn.execute(
            "INSERT INTO metrics (name, value, unit, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                sample.name,
                sample.value,
                sample.unit.as_str(),
                ts(sample.recorded_at)
            ],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(())
    }

    fn query_metrics(
        &self,
        name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        let mut stmt = conn
            .prepare(
                "SELECT name, value, unit, recorded_at FROM metrics
                 WHERE name = ?1 AND recorded_at >= ?2
                 ORDER BY recorded_at ASC",
            )
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let rows = stmt
            .query_map(params![name, ts(since)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        let mut samples = Vec::new();
        for row in rows {
            let (name, value, unit, recorded_at) =
                row.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            let unit = MetricUnit::parse(&unit)
                .ok_or_else(|| StoreError::Corrupted(format!("unknown unit {unit:?}")))?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| StoreError::Corrupted(e.to_string()))?
                .with_timezone(&Utc);
            samples.push(MetricSample {
                name,
                value,
                recorded_at,
                unit,
            });
        }
        Ok(samples)
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        let removed = conn
            .execute(
                "DELETE FROM metrics WHERE recorded_at < ?1",
                params![ts(cutoff)],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(removed)
    }
}

impl StateStore for SqliteStore {
    fn get_state(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        conn.query_row(
            "SELECT value FROM state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::ReadFailed(e.to_string()))
    }

    fn set_state(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        conn.execute(
            "INSERT INTO state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, ts(Utc::now())],
        )
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(())
    }
}
