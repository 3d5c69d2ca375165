//! Communication channels (LINE Messaging API).
//!
//! Webhook envelope types, signature verification, and the reply connector so the
//! gateway can verify inbound POSTs, route text-message events, and send replies.

mod inbound;
mod line;

pub use inbound::InboundMessage;
pub use line::{
    compute_signature, verify_signature, LineChannel, MessageContent, ReplyError, ReplySender,
    WebhookEnvelope, WebhookEvent,
};
