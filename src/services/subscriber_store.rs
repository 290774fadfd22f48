use async_trait::async_trait;

/// How a store treats its backing file after it has been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorePolicy {
    /// The in-memory list is authoritative; the file is only written.
    #[default]
    TrustCache,
    /// Re-read the file before every membership check or insert, so edits
    /// made by hand while the relay runs are picked up.
    ReloadOnCheck,
}

/// Result of [`SubscriberStore::add`].
#[derive(Debug)]
pub enum Insertion {
    /// Newly added and written to durable storage.
    Added,
    /// Already subscribed; nothing changed.
    AlreadyPresent,
    /// Newly added in memory, but the write failed. The entry is lost if the
    /// process stops before the next successful write.
    AddedNotPersisted(anyhow::Error),
}

/// SubscriberStore owns the list of destinations that opted in to pushes.
///
/// It is the single source of truth for the relay: callers never keep their
/// own copy of the list, they ask the store for a snapshot when they need one.
/// Entries are only ever appended, never removed.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Snapshot of all destinations in subscription order
    async fn list(&self) -> Vec<String>;

    /// Whether `destination` is already subscribed
    async fn contains(&self, destination: &str) -> bool;

    /// Append `destination` if it is not present yet
    async fn add(&self, destination: &str) -> Insertion;

    async fn len(&self) -> usize {
        self.list().await.len()
    }
}
