use serde::{Deserialize, Serialize};

/// Outcome level of a check, ordered `Ok < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARN"),
            Self::Critical => write!(f, "CRIT"),
        }
    }
}

impl Severity {
    #[must_use]
    pub const fn emoji(&self) -> &str {
        match self {
            Self::Ok => "✅",
            Self::Warning => "⚠️",
            Self::Critical => "🔴",
        }
    }

    /// Whether a result at this level is worth pushing to recipients.
    #[must_use]
    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }

    /// Worst severity of the iterator, `Ok` when empty.
    pub fn worst<I: IntoIterator<Item = Self>>(levels: I) -> Self {
        levels.into_iter().max().unwrap_or_default()
    }
}
