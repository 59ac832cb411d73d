// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the persisted pipeline collections.
//!
//! Timestamps are stored as ISO 8601 TEXT columns (`strftime`/RFC 3339);
//! the pipeline crates format them with chrono before handing them here.

use serde::{Deserialize, Serialize};

/// A tenant workspace, provisioned at onboarding and read-only to the
/// pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub phone_number_id: String,
    pub owner_id: String,
    pub created_at: String,
}

/// A structured inbound message record.
///
/// `provider_message_id` is unique: a duplicate-key violation on insert is
/// exactly a webhook re-delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub workspace_id: String,
    pub phone_number_id: String,
    /// Sender contact (the provider's `from` field).
    pub contact: String,
    /// Display name from the envelope's `contacts[].profile.name`, if any.
    pub sender_name: Option<String>,
    pub provider_message_id: String,
    pub message_type: String,
    pub text_body: Option<String>,
    pub media_id: Option<String>,
    pub message_timestamp: String,
    /// Delivery status applied by the status reconciler, if any.
    pub status: Option<String>,
    pub status_updated_at: Option<String>,
    pub raw_payload: String,
    pub created_at: String,
}

/// An outbound message record, one per send attempt sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: String,
    pub workspace_id: String,
    pub phone_number_id: String,
    pub recipient: String,
    /// Provider message id; `None` until (unless) the provider acknowledges.
    pub provider_message_id: Option<String>,
    pub message_type: String,
    pub text_body: Option<String>,
    pub message_timestamp: String,
    pub status: String,
    /// Populated only on terminal failure.
    pub error_reason: Option<String>,
    pub retry_count: i64,
    pub status_updated_at: Option<String>,
    pub created_at: String,
}

/// One inbox row per (workspace, phone number, contact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub workspace_id: String,
    pub phone_number_id: String,
    pub contact: String,
    pub last_message: String,
    pub last_message_at: Option<String>,
    pub unread_count: i64,
    pub status: String,
    pub assigned_agent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A durable queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}
