use serde::{Deserialize, Serialize};

/// Kind tag attached to every stored metric sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Load,
    Percent,
    Milliseconds,
    Seconds,
    Gibibytes,
    OpsPerMinute,
    HttpStatus,
    Count,
    /// 1.0 for a passing check, 0.0 for a failing one
    Status,
}

impl MetricUnit {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Percent => "percent",
            Self::Milliseconds => "ms",
            Self::Seconds => "seconds",
            Self::Gibibytes => "gib",
            Self::OpsPerMinute => "ops_per_minute",
            Self::HttpStatus => "http_status",
            Self::Count => "count",
            Self::Status => "status",
        }
    }

    /// Inverse of [`MetricUnit::as_str`].
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let unit = match raw {
            "load" => Self::Load,
            "percent" => Self::Percent,
            "ms" => Self::Milliseconds,
            "seconds" => Self::Seconds,
            "gib" => Self::Gibibytes,
            "ops_per_minute" => Self::OpsPerMinute,
            "http_status" => Self::HttpStatus,
            "count" => Self::Count,
            "status" => Self::Status,
            _ => return None,
        };
        Some(unit)
    }
}

impl std::fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
