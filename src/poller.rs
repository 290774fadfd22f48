use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::models::InboundMessage;
use crate::relay::{PollOutcome, Relay};

/// Drive the relay: poll on every tick and handle inbound chat messages in between.
///
/// Ticks and messages are processed one at a time on this task, so a slow
/// fan-out delays the next tick instead of overlapping it. Returns once the
/// inbound channel is closed.
pub async fn run_relay_loop(
    relay: Arc<Relay>,
    mut inbound: mpsc::Receiver<InboundMessage>,
    poll_interval: Duration,
) {
    info!("Polling news every {}s", poll_interval.as_secs());
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match relay.poll().await {
                    PollOutcome::Delivered { id, sent, failed } => {
                        info!("Item {} delivered to {} destination(s), {} failed", id, sent, failed);
                    }
                    other => debug!("Poll finished: {:?}", other),
                }
            }
            message = inbound.recv() => {
                match message {
                    Some(message) => {
                        relay.handle_inbound(&message).await;
                    }
                    None => {
                        info!("Inbound channel closed, stopping relay loop");
                        break;
                    }
                }
            }
        }
    }
}
