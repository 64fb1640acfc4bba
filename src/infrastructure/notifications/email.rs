use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::ports::notifier::{Channel, NotificationError};

const SUBJECT_CHARS: usize = 120;

/// Where and how to hand mail to the relay.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// `(username, password)`
    pub credentials: Option<(String, String)>,
    pub timeout: Duration,
}

/// Plain-text mail through an SMTP relay, one message per recipient.
///
/// The connection is unencrypted, which suits the local MTA it targets by
/// default.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    subject_prefix: String,
}

impl EmailChannel {
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the sender address
    /// does not parse.
    pub fn new(
        settings: &SmtpSettings,
        sender: &str,
        subject_prefix: &str,
    ) -> Result<Self, NotificationError> {
        let sender: Mailbox = sender.parse().map_err(|e| {
            NotificationError::ChannelUnavailable(format!("invalid sender {sender:?}: {e}"))
        })?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .timeout(Some(settings.timeout));
        if let Some((user, password)) = &settings.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            sender,
            subject_prefix: subject_prefix.trim().to_string(),
        })
    }

    fn message(&self, recipient: &str, text: &str) -> Result<Message, NotificationError> {
        let to: Mailbox = recipient.parse().map_err(|e| {
            NotificationError::SendFailed(format!("invalid recipient {recipient:?}: {e}"))
        })?;
        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject(&self.subject_prefix, text))
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| NotificationError::SendFailed(format!("cannot build message: {e}")))
    }
}

/// Prefix plus the first non-empty line of the body.
fn subject(prefix: &str, text: &str) -> String {
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("report");
    let line: String = first.chars().take(SUBJECT_CHARS).collect();
    format!("{prefix} {line}").trim().to_string()
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotificationError> {
        let message = self.message(recipient, text)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP delivery failed: {e}")))?;
        Ok(())
    }
}
