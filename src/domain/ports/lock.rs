use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("another run holds the lock at {0}")]
    Busy(String),
    #[error("cannot open lock file {path}: {reason}")]
    Io { path: String, reason: String },
}
