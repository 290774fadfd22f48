use anyhow::Result;
use async_trait::async_trait;

pub mod bridge;

pub use bridge::BridgeTransport;

/// Outbound side of the messaging transport.
///
/// Sessions, pairing and reconnects belong to whatever sits behind an
/// implementation; the relay only addresses destinations by id.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Whether the transport can currently accept sends
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    async fn send_image(&self, destination: &str, image_url: &str, caption: &str) -> Result<()>;

    async fn send_text(&self, destination: &str, text: &str) -> Result<()>;
}
