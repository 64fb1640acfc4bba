use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::subscriber::InboundEvent;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("channel does not support inbound events")]
    InboundUnsupported,
}

/// Outbound messaging capability, optionally able to read inbound commands.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short channel name for logs.
    fn name(&self) -> &'static str;

    /// Deliver `text` to one recipient.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the message cannot be delivered.
    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotificationError>;

    /// One bounded fetch of events newer than `since_update_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::InboundUnsupported` for send-only channels,
    /// or another variant if the fetch fails.
    async fn poll_inbound(
        &self,
        _since_update_id: Option<i64>,
    ) -> Result<Vec<InboundEvent>, NotificationError> {
        Err(NotificationError::InboundUnsupported)
    }
}
