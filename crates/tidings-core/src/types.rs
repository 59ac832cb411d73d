// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Tidings pipeline crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Queue topic for normalized inbound webhook events.
pub const INCOMING_QUEUE: &str = "incoming.message.queue";

/// Queue topic for outbound send requests.
pub const OUTGOING_QUEUE: &str = "outgoing.message.queue";

/// Identifier for a tenant workspace. All persisted pipeline state is
/// partitioned by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of an outbound message record.
///
/// `Pending` exists only transiently; `Sent`/`Failed` are written by the
/// outbound sender, `Delivered`/`Read` by the status reconciler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutboundStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

/// A provider delivery-status value from a webhook `statuses[]` callback.
///
/// The provider's status vocabulary is open-ended, so unknown values are
/// carried through verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
    Other(String),
}

impl DeliveryStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "read" => Self::Read,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

/// The normalized event published on [`INCOMING_QUEUE`].
///
/// The webhook ingress resolves the tenant before publishing, so the
/// workspace id is always present by the time a consumer sees this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEnvelope {
    pub workspace_id: WorkspaceId,
    pub payload: serde_json::Value,
}

/// Plain-text content of a text send request, `{"body": "..."}` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub body: String,
}

/// An outbound send request, carried on [`OUTGOING_QUEUE`] or posted to the
/// direct send API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub workspace_id: Option<WorkspaceId>,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub template: Option<serde_json::Value>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
}

impl SendRequest {
    /// Preview string for the conversation aggregate: the text body for
    /// text sends, a bracketed type label otherwise.
    pub fn preview(&self) -> String {
        match (self.message_type.as_str(), &self.text) {
            ("text", Some(text)) => text.body.clone(),
            (kind, _) => format!("[{kind}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_status_round_trips_known_values() {
        for s in ["sent", "delivered", "read", "failed"] {
            assert_eq!(DeliveryStatus::parse(s).as_str(), s);
        }
    }

    #[test]
    fn delivery_status_preserves_unknown_values() {
        let status = DeliveryStatus::parse("deleted");
        assert_eq!(status, DeliveryStatus::Other("deleted".to_string()));
        assert_eq!(status.as_str(), "deleted");
    }

    #[test]
    fn send_request_deserializes_text_shape() {
        let json = r#"{
            "workspace_id": "W1",
            "to": "1555",
            "type": "text",
            "text": {"body": "hi there"}
        }"#;
        let req: SendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.workspace_id, Some(WorkspaceId::from("W1")));
        assert_eq!(req.message_type, "text");
        assert_eq!(req.preview(), "hi there");
        assert!(req.template.is_none());
        assert!(req.phone_number_id.is_none());
    }

    #[test]
    fn send_request_preview_falls_back_to_type_label() {
        let json = r#"{"to": "1555", "type": "template", "template": {"name": "welcome"}}"#;
        let req: SendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.preview(), "[template]");
        assert!(req.workspace_id.is_none());
    }

    #[test]
    fn outbound_status_strings_match_storage_values() {
        assert_eq!(OutboundStatus::Sent.to_string(), "sent");
        assert_eq!(OutboundStatus::Failed.to_string(), "failed");
        assert_eq!(
            "delivered".parse::<OutboundStatus>().unwrap(),
            OutboundStatus::Delivered
        );
    }

    #[test]
    fn queue_envelope_round_trips() {
        let envelope = QueueEnvelope {
            workspace_id: WorkspaceId::from("W1"),
            payload: serde_json::json!({"entry": []}),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let back: QueueEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workspace_id, envelope.workspace_id);
    }
}
