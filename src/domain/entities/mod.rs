pub mod check_result;
pub mod host;
pub mod metric;
pub mod subscriber;

pub use check_result::{CheckResult, Findings};
pub use host::{
    DiskCounters, DiskSnapshot, FileIdentity, FilesystemUsage, LoadAverage, LogOffset,
    MemoryReading,
};
pub use metric::MetricSample;
pub use subscriber::{InboundEvent, SubscriberRecord, SubscriberState};
