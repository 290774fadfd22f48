pub mod config;
pub mod news;
pub mod subscribers;
pub mod transport;

// Re-export commonly used types at models root for convenience
pub use config::AppConfig;
pub use news::NewsItem;
pub use subscribers::SubscriberFile;
pub use transport::{BridgeEvent, InboundMessage};
