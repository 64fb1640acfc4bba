pub mod metric_unit;
pub mod run_mode;
pub mod severity;

pub use metric_unit::MetricUnit;
pub use run_mode::RunMode;
pub use severity::Severity;
