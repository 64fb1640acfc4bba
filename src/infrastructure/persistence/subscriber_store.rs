use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::entities::subscriber::SubscriberState;
use crate::domain::ports::store::{StoreError, SubscriberStore};

/// Subscriber registry kept as a small JSON document.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash never leaves a half-written document.
pub struct JsonSubscriberStore {
    path: PathBuf,
}

impl JsonSubscriberStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SubscriberStore for JsonSubscriberStore {
    fn load(&self) -> Result<SubscriberState, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SubscriberState::default());
            }
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(SubscriberState::default());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::Corrupted(format!("{}: {e}", self.path.display()))
        })
    }

    fn save(&self, state: &SubscriberState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }
        let body =
            serde_json::to_vec_pretty(state).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let tmp = self.temp_path();
        let mut file =
            std::fs::File::create(&tmp).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        file.write_all(&body)
            .and_then(|()| file.sync_all())
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::WriteFailed(e.to_string()))
    }
}
