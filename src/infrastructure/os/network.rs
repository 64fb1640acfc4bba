use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::domain::ports::network::{HttpResponse, NetworkError, NetworkClient};

/// HTTP via `reqwest`, raw TCP via `tokio`.
pub struct HttpNetworkClient {
    client: reqwest::Client,
}

impl HttpNetworkClient {
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hostwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetworkError::InvalidRequest(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    async fn http_get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, NetworkError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(timeout)
                } else if e.is_builder() {
                    NetworkError::InvalidRequest(e.to_string())
                } else {
                    NetworkError::Unreachable(e.to_string())
                }
            })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout(timeout)
            } else {
                NetworkError::Unreachable(e.to_string())
            }
        })?;
        Ok(HttpResponse { status, body })
    }

    async fn tcp_connect(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), NetworkError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| NetworkError::Timeout(timeout))?
            .map_err(|e| NetworkError::Unreachable(format!("{host}:{port}: {e}")))?;
        drop(stream);
        Ok(())
    }
}
