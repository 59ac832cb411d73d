// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business provider boundary.
//!
//! Webhook envelope types with the tagged message-kind union, HMAC-SHA256
//! signature verification, the subscription handshake, and the Graph API
//! send client.

pub mod client;
pub mod signature;
pub mod types;

pub use client::GraphClient;
pub use signature::{verify_signature, verify_webhook_subscription};
pub use types::{
    ChangeValue, Contact, InboundMessageEvent, MessageKind, Metadata, StatusEvent, WebhookEnvelope,
};
