use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat that registered itself through the subscription command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    pub chat_id: String,
    pub registered_at: DateTime<Utc>,
}

/// Persisted subscriber set plus the inbound high-water mark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberState {
    #[serde(default)]
    pub subscribers: Vec<SubscriberRecord>,
    #[serde(default)]
    pub last_update_id: Option<i64>,
}

impl SubscriberState {
    #[must_use]
    pub fn contains(&self, chat_id: &str) -> bool {
        self.subscribers.iter().any(|s| s.chat_id == chat_id)
    }

    /// Adds the chat if absent. Returns `true` when it was newly added.
    pub fn register(&mut self, chat_id: &str, at: DateTime<Utc>) -> bool {
        if self.contains(chat_id) {
            return false;
        }
        self.subscribers.push(SubscriberRecord {
            chat_id: chat_id.to_string(),
            registered_at: at,
        });
        true
    }

    /// Removes the chat. Returns `true` when it was present.
    pub fn unregister(&mut self, chat_id: &str) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.chat_id != chat_id);
        before != self.subscribers.len()
    }

    pub fn chat_ids(&self) -> impl Iterator<Item = &str> {
        self.subscribers.iter().map(|s| s.chat_id.as_str())
    }
}

/// One pending inbound event from the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub update_id: i64,
    /// Sender chat, `None` for events that cannot register (group chats, non-messages)
    pub chat_id: Option<String>,
    pub text: Option<String>,
}
