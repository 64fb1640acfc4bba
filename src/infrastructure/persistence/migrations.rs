use rusqlite::Connection;

/// Ordered schema steps; entry `n` upgrades `user_version` from `n` to `n + 1`.
const MIGRATIONS: &[&str] = &[
    // 1: time series and keyed state
    "CREATE TABLE metrics (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        value       REAL    NOT NULL,
        unit        TEXT    NOT NULL,
        recorded_at TEXT    NOT NULL
    );
    CREATE TABLE state (
        key         TEXT    PRIMARY KEY,
        value       TEXT    NOT NULL,
        updated_at  TEXT    NOT NULL
    );
    CREATE INDEX idx_metrics_recorded_at ON metrics(recorded_at);",
    // 2: one sample per name and instant
    "CREATE UNIQUE INDEX idx_metrics_name_recorded_at ON metrics(name, recorded_at);",
];

#[must_use]
pub const fn latest_version() -> usize {
    MIGRATIONS.len()
}

/// Bring the schema up to date, applying each pending step in its own transaction.
///
/// # Errors
/// Returns `rusqlite::Error` if a step fails; earlier steps stay applied.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let current = usize::try_from(current).unwrap_or(0);
    for (version, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        let target = version + 1;
        tracing::debug!(version = target, "applying schema migration");
        conn.execute_batch(&format!(
            "BEGIN;\n{sql}\nPRAGMA user_version = {target};\nCOMMIT;"
        ))?;
    }
    Ok(())
}
