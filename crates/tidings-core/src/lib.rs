// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tidings messaging pipeline.
//!
//! Provides the shared error type, domain types, and the ambient tenant
//! context carrier used by every other crate in the workspace.

pub mod error;
pub mod tenant;
pub mod types;

pub use error::TidingsError;
pub use tenant::{current_workspace, run_with_tenant};
pub use types::{
    DeliveryStatus, OutboundStatus, QueueEnvelope, SendRequest,
    TextContent, WorkspaceId, INCOMING_QUEUE, OUTGOING_QUEUE,
};
