use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use super::Transport;
use crate::models::transport::{RemoteFile, SendImageRequest, SendTextRequest};

/// WhatsApp HTTP bridge client.
///
/// The bridge process holds the paired session; this type only issues the
/// REST calls for one named session on it.
pub struct BridgeTransport {
    pub client: Client,
    pub base_url: String,
    pub session: String,
    pub api_key: Option<String>,
}

impl BridgeTransport {
    pub fn new(client: Client, base_url: &str, session: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: session.to_string(),
            api_key,
        }
    }

    fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("X-Api-Key", key),
            None => req,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .with_auth(self.client.post(&url))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("bridge non-success: {} body: {}", status, body);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn kind(&self) -> &'static str {
        "whatsapp-bridge"
    }

    async fn ready(&self) -> Result<()> {
        let url = format!("{}/api/sessions/{}", self.base_url, self.session);
        let res = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = res.status();
        if !status.is_success() {
            bail!("bridge session '{}' not available: {}", self.session, status);
        }
        Ok(())
    }

    async fn send_image(&self, destination: &str, image_url: &str, caption: &str) -> Result<()> {
        let payload = SendImageRequest {
            session: &self.session,
            chat_id: destination,
            file: RemoteFile { url: image_url },
            caption,
        };
        self.post("/api/sendImage", &payload).await
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<()> {
        let payload = SendTextRequest {
            session: &self.session,
            chat_id: destination,
            text,
        };
        self.post("/api/sendText", &payload).await
    }
}
