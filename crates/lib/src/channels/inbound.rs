//! Inbound message from the webhook: delivered to the responder for handling.

/// A text-message event to be answered with exactly one reply. Lives for the
/// duration of one webhook invocation.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Single-use reply token from the event; expires quickly.
    pub reply_token: String,
    pub text: String,
}
