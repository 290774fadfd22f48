use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket used to pace outbound chat messages
///
/// A burst of sends to many chats at once is what gets WhatsApp numbers
/// flagged, so every send waits for a token. The bucket starts with a single
/// token and refills one token per `refill_rate` up to `max_tokens`.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<BucketState>>,
    max_tokens: u32,
    refill_rate: Duration,
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// # Example
    /// ```
    /// use news_relay::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // At most one send every two seconds, bursts of up to 30
    /// let limiter = RateLimiter::new(30, Duration::from_secs(2));
    /// ```
    pub fn new(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: 1,
                last_refill: Instant::now(),
            })),
            max_tokens: max_tokens.max(1),
            refill_rate: refill_rate.max(Duration::from_millis(1)),
        }
    }

    /// `None` when `messages_per_minute` is 0, meaning sends are not paced.
    pub fn per_minute(messages_per_minute: u32) -> Option<Self> {
        if messages_per_minute == 0 {
            return None;
        }
        Some(Self::new(
            messages_per_minute,
            Duration::from_secs(60) / messages_per_minute,
        ))
    }

    /// Wait until a token is available, then consume it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.last_refill.elapsed();
                let earned = (elapsed.as_nanos() / self.refill_rate.as_nanos()) as u32;

                if earned > 0 {
                    state.tokens = state.tokens.saturating_add(earned).min(self.max_tokens);
                    // Keep the partial interval so refill does not drift
                    state.last_refill += self.refill_rate * earned;
                }

                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }

                self.refill_rate.saturating_sub(state.last_refill.elapsed())
            };
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}
