// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per persisted collection.

pub mod conversations;
pub mod events;
pub mod inbound;
pub mod outbound;
pub mod queue;
pub mod workspaces;
