use serde::{Deserialize, Serialize};

/// What a single invocation is asked to do.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Collect and report, never notify
    #[default]
    Collect,
    /// Collect, report and notify recipients when something is wrong
    Notify,
    /// Skip collection and push a fixed test message to every recipient
    TestNotify,
    /// Skip collection and only refresh subscribers from inbound events
    PollOnly,
}

impl RunMode {
    /// Modes that run the collectors and need the state store.
    #[must_use]
    pub const fn collects(&self) -> bool {
        matches!(self, Self::Collect | Self::Notify)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collect => write!(f, "collect"),
            Self::Notify => write!(f, "notify"),
            Self::TestNotify => write!(f, "test-notify"),
            Self::PollOnly => write!(f, "poll-only"),
        }
    }
}
