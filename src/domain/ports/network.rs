use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Local network reachability checks.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Issue a GET and return status and body, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` on transport failure or timeout.
    async fn http_get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, NetworkError>;

    /// Open (and immediately drop) a TCP connection.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the port refuses the connection or the timeout elapses.
    async fn tcp_connect(&self, host: &str, port: u16, timeout: Duration)
        -> Result<(), NetworkError>;
}
