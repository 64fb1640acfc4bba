pub mod collector;
pub mod command;
pub mod lock;
pub mod network;
pub mod notifier;
pub mod store;

pub use collector::{CollectionError, HostCollector};
pub use command::{CommandError, CommandOutput, CommandRunner, CommandSpec};
pub use lock::LockError;
pub use network::{HttpResponse, NetworkError, NetworkClient};
pub use notifier::{Channel, NotificationError};
pub use store::{MetricStore, StateStore, StoreError, SubscriberStore};
