use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::entities::subscriber::InboundEvent;
use crate::domain::ports::notifier::{Channel, NotificationError};

/// Bot API limit on message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;
const UPDATE_BATCH: u32 = 100;

/// Telegram Bot API channel: `sendMessage` out, `getUpdates` in.
///
/// The token is part of every request URL, so transport errors are logged
/// with the URL stripped.
pub struct TelegramChannel {
    client: reqwest::Client,
    bot_url: String,
}

impl TelegramChannel {
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the token is empty
    /// or the HTTP client cannot be initialized.
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, NotificationError> {
        if token.trim().is_empty() {
            return Err(NotificationError::ChannelUnavailable(
                "telegram bot token is empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                NotificationError::ChannelUnavailable(format!("cannot build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            bot_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token.trim()),
        })
    }
}

/// Cuts `text` to the Bot API limit, marking the cut with an ellipsis.
#[must_use]
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    edited_message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

impl From<Update> for InboundEvent {
    fn from(update: Update) -> Self {
        // An edited command counts like a fresh one.
        let (chat_id, text) = match update.message.or(update.edited_message) {
            Some(msg) if msg.chat.kind == "private" => (Some(msg.chat.id.to_string()), msg.text),
            Some(msg) => (None, msg.text),
            None => (None, None),
        };
        Self {
            update_id: update.update_id,
            chat_id,
            text,
        }
    }
}

fn transport(e: reqwest::Error) -> NotificationError {
    NotificationError::SendFailed(e.without_url().to_string())
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, recipient: &str, text: &str) -> Result<(), NotificationError> {
        let payload = json!({
            "chat_id": recipient,
            "text": truncate_message(text),
            "disable_web_page_preview": true,
        });
        let response = self
            .client
            .post(format!("{}/sendMessage", self.bot_url))
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let envelope: ApiEnvelope<serde_json::Value> = response.json().await.map_err(transport)?;
        if !status.is_success() || !envelope.ok {
            return Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                envelope.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    async fn poll_inbound(
        &self,
        since_update_id: Option<i64>,
    ) -> Result<Vec<InboundEvent>, NotificationError> {
        let mut query = vec![
            ("timeout", "0".to_string()),
            ("limit", UPDATE_BATCH.to_string()),
        ];
        if let Some(last) = since_update_id {
            query.push(("offset", (last + 1).to_string()));
        }
        let response = self
            .client
            .get(format!("{}/getUpdates", self.bot_url))
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let envelope: ApiEnvelope<Vec<Update>> = response.json().await.map_err(transport)?;
        if !status.is_success() || !envelope.ok {
            return Err(NotificationError::SendFailed(format!(
                "getUpdates HTTP {}: {}",
                status.as_u16(),
                envelope.description.unwrap_or_default()
            )));
        }
        Ok(envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .map(InboundEvent::from)
            .collect())
    }
}
