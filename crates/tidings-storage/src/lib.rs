// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Tidings messaging pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, tenant-scoped typed queries for
//! every pipeline collection, and a crash-safe durable queue.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod scope;

pub use database::Database;
pub use models::*;
pub use scope::TenantScope;
