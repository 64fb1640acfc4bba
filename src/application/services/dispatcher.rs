use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::domain::entities::subscriber::{InboundEvent, SubscriberState};
use crate::domain::ports::notifier::Channel;
use crate::domain::ports::store::SubscriberStore;

/// Per-dispatch delivery tally. Individual failures never abort a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub delivered: usize,
    /// `(recipient, reason)` for every failed send
    pub failed: Vec<(String, String)>,
}

impl DispatchSummary {
    #[must_use]
    pub fn fully_delivered(&self) -> bool {
        self.failed.is_empty() && self.delivered == self.attempted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub events: usize,
    pub registered: Vec<String>,
    pub removed: Vec<String>,
    pub last_update_id: Option<i64>,
}

/// Inbound command settings.
#[derive(Debug, Clone)]
pub struct SubscriptionCommands {
    pub subscribe: String,
    pub unsubscribe: String,
    pub welcome: String,
}

/// Delivers report text through every configured channel, and registers
/// subscribers from inbound commands on the primary one.
///
/// The primary channel serves static recipients plus subscribers; further
/// channels only serve their own static recipients.
pub struct NotificationDispatcher<'a> {
    channel: &'a dyn Channel,
    static_recipients: &'a [String],
    subscribers: Option<&'a dyn SubscriberStore>,
    commands: SubscriptionCommands,
    others: Vec<(&'a dyn Channel, &'a [String])>,
}

async fn deliver(
    channel: &dyn Channel,
    recipients: Vec<String>,
    text: &str,
    summary: &mut DispatchSummary,
) {
    for recipient in recipients {
        summary.attempted += 1;
        match channel.send(&recipient, text).await {
            Ok(()) => {
                tracing::info!(channel = channel.name(), recipient = %recipient, "notification sent");
                summary.delivered += 1;
            }
            Err(e) => {
                tracing::warn!(channel = channel.name(), recipient = %recipient, "notification failed: {e}");
                summary
                    .failed
                    .push((recipient, format!("{}: {e}", channel.name())));
            }
        }
    }
}

/// `/start@my_bot args` → `/start`.
fn command_of(text: &str) -> Option<&str> {
    let word = text.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

impl<'a> NotificationDispatcher<'a> {
    #[must_use]
    pub const fn new(
        channel: &'a dyn Channel,
        static_recipients: &'a [String],
        subscribers: Option<&'a dyn SubscriberStore>,
        commands: SubscriptionCommands,
    ) -> Self {
        Self {
            channel,
            static_recipients,
            subscribers,
            commands,
            others: Vec::new(),
        }
    }

    /// Also deliver through `channel` to `recipients`.
    #[must_use]
    pub fn with_channel(mut self, channel: &'a dyn Channel, recipients: &'a [String]) -> Self {
        self.others.push((channel, recipients));
        self
    }

    /// Static recipients followed by subscribers, first occurrence wins.
    ///
    /// An unreadable subscriber store degrades to static recipients only.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        let subscribed = match self.subscribers.map(|store| store.load()) {
            Some(Ok(state)) => state.chat_ids().map(str::to_string).collect(),
            Some(Err(e)) => {
                tracing::warn!("subscriber store unreadable, using static recipients only: {e}");
                Vec::new()
            }
            None => Vec::new(),
        };
        for id in self.static_recipients.iter().cloned().chain(subscribed) {
            let id = id.trim().to_string();
            if !id.is_empty() && !all.contains(&id) {
                all.push(id);
            }
        }
        all
    }

    /// Send `text` through every channel to each of its recipients,
    /// continuing past individual failures.
    pub async fn broadcast(&self, text: &str) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        deliver(self.channel, self.recipients(), text, &mut summary).await;
        for (channel, recipients) in &self.others {
            let recipients = recipients
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
            deliver(*channel, recipients, text, &mut summary).await;
        }
        if summary.attempted == 0 {
            tracing::warn!("no recipients configured, nothing sent");
        }
        summary
    }

    /// One bounded fetch of inbound events; registers or removes senders and
    /// always advances the high-water mark past every event seen.
    ///
    /// # Errors
    ///
    /// Returns an error if no subscriber store is configured, the store cannot
    /// be read or written, or the channel cannot be polled.
    pub async fn poll_subscribers(&self, now: DateTime<Utc>) -> Result<PollSummary> {
        let store = self
            .subscribers
            .context("inbound polling needs a subscriber store")?;
        let mut state = store.load().context("failed to load subscriber store")?;
        let since = state.last_update_id;

        let events = self
            .channel
            .poll_inbound(since)
            .await
            .with_context(|| format!("failed to poll {} updates", self.channel.name()))?;

        let mut summary = PollSummary {
            events: events.len(),
            ..PollSummary::default()
        };
        let mut high_water = since;
        for event in events {
            high_water = Some(high_water.map_or(event.update_id, |h| h.max(event.update_id)));
            if since.is_some_and(|last| event.update_id <= last) {
                tracing::debug!(update_id = event.update_id, "skipping already processed event");
                continue;
            }
            self.apply(&event, &mut state, now, &mut summary).await;
        }

        state.last_update_id = high_water;
        summary.last_update_id = high_water;
        store
            .save(&state)
            .context("failed to save subscriber store")?;
        tracing::info!(
            events = summary.events,
            registered = summary.registered.len(),
            removed = summary.removed.len(),
            "inbound events processed"
        );
        Ok(summary)
    }

    async fn apply(
        &self,
        event: &InboundEvent,
        state: &mut SubscriberState,
        now: DateTime<Utc>,
        summary: &mut PollSummary,
    ) {
        let (Some(chat_id), Some(text)) = (event.chat_id.as_deref(), event.text.as_deref()) else {
            return;
        };
        let Some(command) = command_of(text) else {
            return;
        };
        if command == self.commands.subscribe {
            if !state.register(chat_id, now) {
                return;
            }
            summary.registered.push(chat_id.to_string());
            tracing::info!(chat = chat_id, "subscriber registered");
            if let Err(e) = self.channel.send(chat_id, &self.commands.welcome).await {
                tracing::warn!(chat = chat_id, "welcome message failed: {e}");
            }
        } else if command == self.commands.unsubscribe && state.unregister(chat_id) {
            summary.removed.push(chat_id.to_string());
            tracing::info!(chat = chat_id, "subscriber removed");
        }
    }
}
