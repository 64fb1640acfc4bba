use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::entities::metric::MetricSample;
use crate::domain::entities::subscriber::SubscriberState;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("stored value is corrupted: {0}")]
    Corrupted(String),
}

/// Append-only time series of metric samples.
pub trait MetricStore: Send + Sync {
    /// Persist one sample. Writing the same `(name, recorded_at)` twice is an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the insert fails or the sample already exists.
    fn record_metric(&self, sample: &MetricSample) -> Result<(), StoreError>;

    /// Samples named `name` recorded at or after `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the query fails.
    fn query_metrics(
        &self,
        name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError>;

    /// Delete every sample recorded strictly before `cutoff`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the deletion fails.
    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Keyed scalars overwritten in place (offsets, snapshots, timestamps).
pub trait StateStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lookup fails.
    fn get_state(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the upsert fails.
    fn set_state(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Subscriber registry of the inbound-capable channel.
pub trait SubscriberStore: Send + Sync {
    /// Load the current state; a store that was never written is empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupted` if the persisted document cannot be parsed.
    fn load(&self) -> Result<SubscriberState, StoreError>;

    /// Replace the persisted state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the document cannot be written.
    fn save(&self, state: &SubscriberState) -> Result<(), StoreError>;
}

/// Read a JSON-encoded state entry. An entry that no longer parses reads as absent.
///
/// # Errors
///
/// Returns `StoreError::ReadFailed` if the underlying lookup fails.
pub fn get_json_state<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = store.get_state(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, "ignoring unreadable state entry: {e}");
            Ok(None)
        }
    }
}

/// Write a state entry as JSON.
///
/// # Errors
///
/// Returns `StoreError::WriteFailed` if serialization or the upsert fails.
pub fn set_json_state<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    store.set_state(key, &raw)
}
