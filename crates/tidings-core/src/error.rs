// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tidings messaging pipeline.

use thiserror::Error;

/// The primary error type used across all Tidings crates.
#[derive(Debug, Error)]
pub enum TidingsError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A unique-constraint violation on insert.
    ///
    /// Under at-least-once delivery this signals a webhook re-delivery and is
    /// treated as success by consumers, never escalated.
    #[error("duplicate key: {constraint}")]
    DuplicateKey { constraint: String },

    /// Provider API errors (Graph API failure, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Webhook signature verification failed. Mapped to HTTP 403 at the boundary.
    #[error("webhook signature verification failed")]
    SignatureVerification,

    /// No workspace is provisioned for the given provider phone-number id.
    ///
    /// A webhook for an unknown tenant must fail loud: silent success would
    /// mask a provisioning error.
    #[error("no workspace found for phone_number_id {phone_number_id}")]
    WorkspaceNotFound { phone_number_id: String },

    /// Queue publish/consume errors.
    #[error("queue error: {0}")]
    Queue(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidingsError {
    /// Returns true if this error is a unique-constraint violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, TidingsError::DuplicateKey { .. })
    }
}
