pub mod json_store;
pub mod subscriber_store;
#[cfg(test)]
pub mod mock_store;

pub use json_store::JsonSubscriberStore;
pub use subscriber_store::{Insertion, StorePolicy, SubscriberStore};
