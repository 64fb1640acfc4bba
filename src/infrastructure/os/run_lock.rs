use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::domain::ports::lock::LockError;

/// Exclusive advisory lock held for the lifetime of a run.
///
/// Released when dropped, or by the kernel if the process dies.
pub struct RunLock {
    _flock: Flock<File>,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Busy` if another process holds it, or
    /// `LockError::Io` if the lock file cannot be created.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let io_err = |reason: String| LockError::Io {
            path: path.display().to_string(),
            reason,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| io_err(e.to_string()))?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => {
                tracing::debug!(path = %path.display(), "run lock acquired");
                Ok(Self {
                    _flock: flock,
                    path: path.to_path_buf(),
                })
            }
            Err((_, Errno::EWOULDBLOCK)) => Err(LockError::Busy(path.display().to_string())),
            Err((_, errno)) => Err(io_err(errno.to_string())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
