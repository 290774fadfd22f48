//! Subscription handling, change detection and fan-out.

use anyhow::Result;
use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::models::{InboundMessage, NewsItem};
use crate::news_source::NewsSource;
use crate::rate_limiter::RateLimiter;
use crate::services::{Insertion, SubscriberStore};
use crate::transport::Transport;

/// Chat command that subscribes the sending chat
pub const ACTIVATE_COMMAND: &str = ".active";

pub const ACTIVATION_CONFIRMATION: &str = "News bot is now active for this chat.";

/// Outcome of a single [`Relay::poll`] tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll was still running; this tick did nothing
    InFlight,
    /// The news source could not be read; state is unchanged
    FetchFailed,
    /// The source returned the item we already delivered
    Unchanged,
    /// A new item was fanned out
    Delivered { id: String, sent: usize, failed: usize },
}

/// Outcome of [`Relay::activate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    AlreadyActive,
    /// Newly subscribed; `welcomed` is true when the cached item was pushed
    Activated { welcomed: bool },
}

/// Point-in-time view of the relay for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub subscribers: usize,
    pub latest_id: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_change_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RelayState {
    latest_item: Option<NewsItem>,
    last_success_at: Option<DateTime<Utc>>,
    last_change_at: Option<DateTime<Utc>>,
}

impl RelayState {
    fn latest_id(&self) -> Option<&str> {
        self.latest_item.as_ref().map(|item| item.id.as_str())
    }
}

/// Owns everything the relay mutates: the latest-seen item lives here, the
/// subscriber list lives in the store.
pub struct Relay {
    store: Arc<dyn SubscriberStore>,
    source: Arc<dyn NewsSource>,
    transport: Arc<dyn Transport>,
    throttle: Option<RateLimiter>,
    footer: Option<String>,
    state: Mutex<RelayState>,
    polling: AtomicBool,
}

/// Clears the in-flight flag when a poll finishes, including on early return
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Relay {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        source: Arc<dyn NewsSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            source,
            transport,
            throttle: None,
            footer: None,
            state: Mutex::new(RelayState::default()),
            polling: AtomicBool::new(false),
        }
    }

    pub fn with_throttle(mut self, throttle: Option<RateLimiter>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_footer(mut self, footer: Option<String>) -> Self {
        self.footer = footer;
        self
    }

    /// Format the chat caption for `item`
    pub fn caption(&self, item: &NewsItem) -> String {
        let mut caption = format!(
            "*{}*\n\n{}\n\nRead more: [News Link]({})",
            decode_html_entities(item.title.trim()),
            decode_html_entities(item.text.trim()),
            item.news_url.trim()
        );
        if let Some(footer) = &self.footer {
            caption.push_str("\n\n");
            caption.push_str(footer);
        }
        caption
    }

    async fn throttled(&self) {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }
    }

    /// Send `item` to a single destination
    pub async fn deliver(&self, destination: &str, item: &NewsItem) -> Result<()> {
        let caption = self.caption(item);
        self.throttled().await;
        if item.has_image() {
            self.transport
                .send_image(destination, item.image.trim(), &caption)
                .await
        } else {
            debug!("Item {} has no image, sending caption as text", item.id);
            self.transport.send_text(destination, &caption).await
        }
    }

    /// Subscribe `destination`, confirming and pushing the cached item on first activation
    pub async fn activate(&self, destination: &str) -> Activation {
        match self.store.add(destination).await {
            Insertion::AlreadyPresent => {
                debug!("{} is already active", destination);
                return Activation::AlreadyActive;
            }
            Insertion::Added => {
                info!("Activated {}", destination);
            }
            Insertion::AddedNotPersisted(e) => {
                error!(
                    "Activated {} in memory but failed to persist subscriber list: {:#}",
                    destination, e
                );
            }
        }

        self.throttled().await;
        if let Err(e) = self
            .transport
            .send_text(destination, ACTIVATION_CONFIRMATION)
            .await
        {
            warn!("Failed to confirm activation to {}: {:#}", destination, e);
        }

        let cached = self.state.lock().await.latest_item.clone();
        let welcomed = match cached {
            Some(item) => match self.deliver(destination, &item).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Welcome push of {} to {} failed: {:#}", item.id, destination, e);
                    false
                }
            },
            None => false,
        };

        Activation::Activated { welcomed }
    }

    /// React to an inbound chat message; only the activation command is recognized
    pub async fn handle_inbound(&self, message: &InboundMessage) -> Option<Activation> {
        if message.body.trim() != ACTIVATE_COMMAND {
            return None;
        }
        Some(self.activate(&message.from).await)
    }

    /// Fetch the current item and fan it out if it differs from the last one seen
    pub async fn poll(&self) -> PollOutcome {
        if self
            .polling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous poll still running, skipping this tick");
            return PollOutcome::InFlight;
        }
        let _guard = PollGuard(&self.polling);

        let item = match self.source.fetch_latest().await {
            Ok(item) => item,
            Err(e) => {
                warn!("Failed to fetch news: {:#}", e);
                return PollOutcome::FetchFailed;
            }
        };

        {
            let mut state = self.state.lock().await;
            state.last_success_at = Some(Utc::now());
            if state.latest_id() == Some(item.id.as_str()) {
                debug!("Latest item {} unchanged", item.id);
                return PollOutcome::Unchanged;
            }
            state.latest_item = Some(item.clone());
            state.last_change_at = state.last_success_at;
        }

        let destinations = self.store.list().await;
        info!(
            "New item {}: {} -> notifying {} destination(s)",
            item.id,
            item.title,
            destinations.len()
        );

        let mut sent = 0;
        let mut failed = 0;
        for destination in &destinations {
            match self.deliver(destination, &item).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    error!("Delivery of {} to {} failed: {:#}", item.id, destination, e);
                }
            }
        }

        PollOutcome::Delivered {
            id: item.id,
            sent,
            failed,
        }
    }

    pub async fn status(&self) -> RelayStatus {
        let subscribers = self.store.len().await;
        let state = self.state.lock().await;
        RelayStatus {
            subscribers,
            latest_id: state.latest_id().map(str::to_string),
            last_success_at: state.last_success_at,
            last_change_at: state.last_change_at,
        }
    }
}
