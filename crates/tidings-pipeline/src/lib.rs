// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Tidings message pipeline.
//!
//! Connects the webhook ingress, the durable queue, the inbound consumer,
//! the outbound sender, and the status reconciler. Every stage
//! re-establishes the tenant context per message; nothing here holds
//! cross-message state.

pub mod inbound;
pub mod ingress;
pub mod outbound;
pub mod reconcile;
pub mod worker;

pub use ingress::{IngressOutcome, WebhookIngress};
pub use outbound::OutboundSender;
pub use worker::{run_worker, WorkerOptions};
