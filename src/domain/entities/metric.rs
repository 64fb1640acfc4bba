use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::MetricUnit;

/// One time-series point. `(name, recorded_at)` is unique in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub unit: MetricUnit,
}

impl MetricSample {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, unit: MetricUnit, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value,
            recorded_at: at,
            unit,
        }
    }

    /// A 0/1 pass or fail outcome.
    #[must_use]
    pub fn status(name: impl Into<String>, passed: bool, at: DateTime<Utc>) -> Self {
        Self::new(
            name,
            if passed { 1.0 } else { 0.0 },
            MetricUnit::Status,
            at,
        )
    }

    /// Human rendering used by the report.
    #[must_use]
    pub fn display_value(&self) -> String {
        match self.unit {
            MetricUnit::Percent => format!("{:.0}%", self.value),
            MetricUnit::Milliseconds => format!("{:.0} ms", self.value),
            MetricUnit::Seconds => format!("{:.0} s", self.value),
            MetricUnit::Gibibytes => format!("{:.1} GiB", self.value),
            MetricUnit::OpsPerMinute => format!("{:.0} ops/min", self.value),
            MetricUnit::HttpStatus | MetricUnit::Count => format!("{:.0}", self.value),
            MetricUnit::Load => format!("{:.2}", self.value),
            MetricUnit::Status => {
                if self.value > 0.0 {
                    "OK".to_string()
                } else {
                    "FAIL".to_string()
                }
            }
        }
    }
}
