// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde types for the WhatsApp Business webhook envelope and the
//! Graph API send surface.
//!
//! Message kinds are a single tagged union; preview text, type labels,
//! and media metadata all derive from one exhaustive match so a new kind
//! only needs one variant added.

use serde::{Deserialize, Serialize};

/// Top-level webhook envelope (`object`, `entry[]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

/// `entry[].changes[].value`: metadata plus messages and/or statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessageEvent>,
    #[serde(default)]
    pub statuses: Vec<StatusEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    pub phone_number_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
}

/// One inbound message from `value.messages[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessageEvent {
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Unix epoch seconds as a decimal string.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub kind: MessageKind,
}

/// A delivery status callback from `value.statuses[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Provider message id the status refers to.
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

/// The message-kind union, tagged by the provider's `type` field.
///
/// Kinds the pipeline does not model deserialize as [`MessageKind::Unknown`]
/// rather than failing the whole envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    Text { text: TextBody },
    Image { image: MediaObject },
    Audio { audio: MediaObject },
    Video { video: MediaObject },
    Document { document: MediaObject },
    Interactive { interactive: InteractiveContent },
    Location { location: LocationContent },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Interactive reply payload (button or list selection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveContent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub button_reply: Option<InteractiveReply>,
    #[serde(default)]
    pub list_reply: Option<InteractiveReply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveReply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationContent {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl MessageKind {
    /// The provider's type label for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text { .. } => "text",
            MessageKind::Image { .. } => "image",
            MessageKind::Audio { .. } => "audio",
            MessageKind::Video { .. } => "video",
            MessageKind::Document { .. } => "document",
            MessageKind::Interactive { .. } => "interactive",
            MessageKind::Location { .. } => "location",
            MessageKind::Unknown => "unknown",
        }
    }

    /// Conversation preview text: the body for text and interactive
    /// replies, a bracketed type label for everything else.
    pub fn preview(&self) -> String {
        match self {
            MessageKind::Text { text } => text.body.clone(),
            MessageKind::Interactive { interactive } => interactive
                .button_reply
                .as_ref()
                .or(interactive.list_reply.as_ref())
                .map(|r| r.title.clone())
                .unwrap_or_else(|| "[interactive]".to_string()),
            other => format!("[{}]", other.label()),
        }
    }

    /// Plain text body, when this kind carries one.
    pub fn text_body(&self) -> Option<&str> {
        match self {
            MessageKind::Text { text } => Some(&text.body),
            _ => None,
        }
    }

    /// Provider media id for downloadable kinds.
    pub fn media_id(&self) -> Option<&str> {
        match self {
            MessageKind::Image { image: m }
            | MessageKind::Audio { audio: m }
            | MessageKind::Video { video: m }
            | MessageKind::Document { document: m } => m.id.as_deref(),
            _ => None,
        }
    }
}

impl WebhookEnvelope {
    /// The first change value, which is the unit of processing. WhatsApp
    /// sends one change per delivery in practice.
    pub fn first_value(&self) -> Option<&ChangeValue> {
        self.entry.first()?.changes.first().map(|c| &c.value)
    }

    /// `metadata.phone_number_id` from the first change, the tenant
    /// routing key.
    pub fn phone_number_id(&self) -> Option<&str> {
        self.first_value()?
            .metadata
            .as_ref()
            .map(|m| m.phone_number_id.as_str())
    }
}

/// Graph API send response: `{"messages":[{"id": "..."}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessageId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessageId {
    pub id: String,
}

/// Graph API error payload: `{"error":{"message": "..."}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}
