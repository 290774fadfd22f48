use serde::{Deserialize, Serialize};

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
}

/// Webhook envelope posted by the messaging bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeEvent {
    pub event: String,
    #[serde(default)]
    pub session: Option<String>,
    /// Shape depends on `event`; only message payloads are decoded
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeMessagePayload {
    pub from: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl BridgeEvent {
    /// Text messages from a known sender only; media without a caption,
    /// anonymous payloads and non-message events yield `None`.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        if self.event != "message" {
            return None;
        }
        let payload: BridgeMessagePayload = serde_json::from_value(self.payload?).ok()?;
        let from = payload.from.trim();
        if from.is_empty() {
            return None;
        }
        let body = payload.body.filter(|b| !b.is_empty())?;
        Some(InboundMessage {
            from: from.to_string(),
            body,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendImageRequest<'a> {
    pub session: &'a str,
    #[serde(rename = "chatId")]
    pub chat_id: &'a str,
    pub file: RemoteFile<'a>,
    pub caption: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteFile<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendTextRequest<'a> {
    pub session: &'a str,
    #[serde(rename = "chatId")]
    pub chat_id: &'a str,
    pub text: &'a str,
}
