use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::domain::entities::metric::MetricSample;
use crate::domain::ports::store::{MetricStore, StateStore, StoreError};

/// In-memory store for testing purposes.
pub struct InMemoryStore {
    metrics: Mutex<Vec<MetricSample>>,
    state: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Mutex::new(Vec::new()),
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Every sample currently held, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the lock is poisoned.
    pub fn all_metrics(&self) -> Result<Vec<MetricSample>, StoreError> {
        Ok(self
            .metrics
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore for InMemoryStore {
    fn record_metric(&self, sample: &MetricSample) -> Result<(), StoreError> {
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        if metrics
            .iter()
            .any(|m| m.name == sample.name && m.recorded_at == sample.recorded_at)
        {
            return Err(StoreError::WriteFailed(format!(
                "duplicate sample {} at {}",
                sample.name, sample.recorded_at
            )));
        }
        metrics.push(sample.clone());
        drop(metrics);
        Ok(())
    }

    fn query_metrics(
        &self,
        name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let mut found: Vec<MetricSample> = self
            .metrics
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .iter()
            .filter(|m| m.name == name && m.recorded_at >= since)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.recorded_at);
        Ok(found)
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;
        let before = metrics.len();
        metrics.retain(|m| m.recorded_at >= cutoff);
        Ok(before - metrics.len())
    }
}

impl StateStore for InMemoryStore {
    fn get_state(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .state
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?
            .get(key)
            .cloned())
    }

    fn set_state(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
