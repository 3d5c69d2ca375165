//! Gateway: HTTP webhook server for the LINE Messaging API.
//!
//! One port serves the health probe and the webhook. Signature verification gates
//! everything; dispatch routes text-message events to the responder.

mod server;

pub use server::{run_gateway, GatewayState};
