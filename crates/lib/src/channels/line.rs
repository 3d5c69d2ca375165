//! LINE channel: webhook signature verification and replies via the Messaging API.

use crate::config::LineCredentials;
use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

const LINE_API_BASE: &str = "https://api.line.me";

type HmacSha256 = Hmac<Sha256>;

/// Base64-encoded HMAC-SHA256 of the raw request body, keyed by the channel secret.
/// This is the value LINE sends in the X-Line-Signature header.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        // HMAC accepts keys of any length; unreachable.
        Err(_) => return String::new(),
    };
    mac.update(body);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// True when `signature` matches the expected signature for `body`. An absent
/// (empty) signature never verifies.
pub fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    !signature.is_empty() && compute_signature(secret, body) == signature
}

/// Webhook request body: a batch of events.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// One webhook event, tagged by `type`. Everything that is not a message
/// (follow, unfollow, postback, ...) falls into `Other` and is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Message {
        #[serde(rename = "replyToken")]
        reply_token: String,
        message: MessageContent,
    },
    #[serde(other)]
    Other,
}

/// Message payload, tagged by `type`. Only text messages are routed to the responder;
/// stickers, images, and the rest fall into `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Error sending a reply through the Messaging API. Not recovered by the responder;
/// the gateway logs it and still acknowledges the webhook.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("reply request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reply api error: {0} {1}")]
    Api(u16, String),
}

/// Sends a reply for an inbound event. Implemented by [`LineChannel`]; tests use a
/// recording stub.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError>;
}

/// LINE channel connector: verifies webhook signatures and sends replies.
pub struct LineChannel {
    channel_secret: String,
    access_token: String,
    api_base: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(credentials: &LineCredentials, api_base: Option<String>, timeout: Duration) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        Self {
            channel_secret: credentials.channel_secret.clone(),
            access_token: credentials.channel_access_token.clone(),
            api_base,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Verify the X-Line-Signature header value against the raw body.
    pub fn verify(&self, signature: &str, body: &[u8]) -> bool {
        verify_signature(&self.channel_secret, signature, body)
    }

    /// POST /v2/bot/message/reply — send one text message for a reply token.
    /// Not retried; the token is single-use.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": [{ "type": "text", "text": text }],
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ReplyError::Api(status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySender for LineChannel {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError> {
        self.reply(reply_token, text).await
    }
}
