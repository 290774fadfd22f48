use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::services::subscriber_store::{Insertion, SubscriberStore};

/// Mock implementation of SubscriberStore for testing
///
/// Keeps everything in memory. `persisted()` reflects what a successful write
/// would have put on disk, so tests can tell memory and durable state apart.
#[derive(Debug, Clone, Default)]
pub struct MockSubscriberStore {
    memory: Arc<Mutex<Vec<String>>>,
    persisted: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockSubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(subscribers: &[&str]) -> Self {
        let store = Self::new();
        let list: Vec<String> = subscribers.iter().map(|s| s.to_string()).collect();
        *store.memory.lock().unwrap() = list.clone();
        *store.persisted.lock().unwrap() = list;
        store
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn persisted(&self) -> Vec<String> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriberStore for MockSubscriberStore {
    async fn list(&self) -> Vec<String> {
        self.memory.lock().unwrap().clone()
    }

    async fn contains(&self, destination: &str) -> bool {
        self.memory.lock().unwrap().iter().any(|d| d == destination)
    }

    async fn add(&self, destination: &str) -> Insertion {
        let mut memory = self.memory.lock().unwrap();
        if memory.iter().any(|d| d == destination) {
            return Insertion::AlreadyPresent;
        }
        memory.push(destination.to_string());

        if self.fail_writes.load(Ordering::SeqCst) {
            return Insertion::AddedNotPersisted(anyhow!("simulated write failure"));
        }
        *self.persisted.lock().unwrap() = memory.clone();
        Insertion::Added
    }
}
