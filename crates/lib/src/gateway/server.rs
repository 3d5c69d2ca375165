//! Gateway HTTP server: health endpoint and LINE webhook.

use crate::channels::{
    InboundMessage, LineChannel, MessageContent, ReplySender, WebhookEnvelope, WebhookEvent,
};
use crate::config::{self, Config};
use crate::forecast::ForecastClient;
use crate::responder;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

const RUNNING_BODY: &str = "LINE Bot is running!";

/// Shared state for the gateway (channel connector and forecast client).
#[derive(Clone)]
pub struct GatewayState {
    pub line: Arc<LineChannel>,
    pub forecast: ForecastClient,
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Fails fast when the LINE channel secret or access token cannot be resolved.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let credentials = config::resolve_line_credentials(&config)?;
    let timeout = Duration::from_secs(config.forecast.timeout_secs);
    let state = GatewayState {
        line: Arc::new(LineChannel::new(
            &credentials,
            config.channels.line.api_base.clone(),
            timeout,
        )),
        forecast: ForecastClient::new(config.forecast.endpoint.clone(), timeout),
    };

    let app = Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(line_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a fixed running-status string (for probes).
async fn health_http() -> &'static str {
    RUNNING_BODY
}

/// POST /webhook — verifies X-Line-Signature over the raw body, parses the event
/// envelope, and answers each text message. Only a missing/invalid signature or an
/// unparseable envelope is a 400; once dispatch runs, the response is 200 "OK"
/// regardless of responder or reply outcomes.
async fn line_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let signature = headers
        .get("X-Line-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    log::debug!("webhook signature: {}", signature);
    log::debug!("webhook body: {}", String::from_utf8_lossy(&body));

    if !state.line.verify(signature, &body) {
        log::warn!("webhook signature verification failed");
        return (StatusCode::BAD_REQUEST, "");
    }
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("webhook envelope parse failed: {}", e);
            return (StatusCode::BAD_REQUEST, "");
        }
    };
    dispatch_events(state.line.as_ref(), &state.forecast, envelope).await;
    (StatusCode::OK, "OK")
}

/// Route each text-message event to the responder; non-message and non-text events
/// are skipped. Events are processed in order, one reply per event.
async fn dispatch_events(
    sender: &dyn ReplySender,
    forecast: &ForecastClient,
    envelope: WebhookEnvelope,
) {
    for event in envelope.events {
        let WebhookEvent::Message {
            reply_token,
            message,
        } = event
        else {
            continue;
        };
        let MessageContent::Text { text } = message else {
            continue;
        };
        process_inbound_message(sender, forecast, InboundMessage { reply_token, text }).await;
    }
}

/// Process one inbound text message: compute the reply, send it once. A failed send
/// is logged and does not change the webhook response.
async fn process_inbound_message(
    sender: &dyn ReplySender,
    forecast: &ForecastClient,
    msg: InboundMessage,
) {
    let reply = responder::respond(&msg.text, forecast).await;
    if let Err(e) = sender.send_reply(&msg.reply_token, &reply).await {
        log::warn!("inbound: reply send failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ReplyError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Records replies instead of calling the Messaging API.
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingSender {
        fn new(fail: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl ReplySender for RecordingSender {
        async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), ReplyError> {
            self.sent
                .lock()
                .await
                .push((reply_token.to_string(), text.to_string()));
            if self.fail {
                Err(ReplyError::Api(500, "boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn unroutable_forecast() -> ForecastClient {
        ForecastClient::new(
            "http://127.0.0.1:9/forecast.json".to_string(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn dispatch_replies_once_per_text_event() {
        let sender = RecordingSender::new(false);
        let envelope: WebhookEnvelope = serde_json::from_str(
            r#"{"events":[
                {"type":"message","replyToken":"r-1","message":{"type":"text","text":"こんにちは"}},
                {"type":"follow","replyToken":"r-2"},
                {"type":"message","replyToken":"r-3","message":{"type":"sticker","packageId":"1","stickerId":"2"}},
                {"type":"message","replyToken":"r-4","message":{"type":"text","text":"hello"}}
            ]}"#,
        )
        .expect("parse envelope");

        dispatch_events(&sender, &unroutable_forecast(), envelope).await;

        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "r-1");
        assert_eq!(sent[0].1, responder::help_reply());
        assert_eq!(sent[1].0, "r-4");
        assert_eq!(sent[1].1, responder::help_reply());
    }

    #[tokio::test]
    async fn failed_send_does_not_stop_dispatch() {
        let sender = RecordingSender::new(true);
        let envelope: WebhookEnvelope = serde_json::from_str(
            r#"{"events":[
                {"type":"message","replyToken":"r-1","message":{"type":"text","text":"a"}},
                {"type":"message","replyToken":"r-2","message":{"type":"text","text":"b"}}
            ]}"#,
        )
        .expect("parse envelope");

        dispatch_events(&sender, &unroutable_forecast(), envelope).await;

        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 2);
    }
}
