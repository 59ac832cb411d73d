// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ambient tenant context carrier.
//!
//! Every pipeline entry point (HTTP request handling, queue-message
//! handling) wraps its work in [`run_with_tenant`], and any storage
//! operation executed inside that future observes the active workspace via
//! [`current_workspace`]. The carrier is a `tokio::task_local!` value: it
//! follows the future across await points, is restored on exit (including
//! on panic), and never leaks into concurrently spawned tasks.

use crate::types::WorkspaceId;

tokio::task_local! {
    static ACTIVE_WORKSPACE: WorkspaceId;
}

/// Runs `fut` with `workspace_id` as the ambient tenant.
///
/// Nested calls shadow the outer scope for their own duration only; the
/// innermost active scope always wins.
pub async fn run_with_tenant<F>(workspace_id: WorkspaceId, fut: F) -> F::Output
where
    F: Future,
{
    ACTIVE_WORKSPACE.scope(workspace_id, fut).await
}

/// Returns the ambient workspace id, or `None` when no tenant context is
/// active (unscoped callers such as the workspace resolver).
pub fn current_workspace() -> Option<WorkspaceId> {
    ACTIVE_WORKSPACE.try_with(|w| w.clone()).ok()
}
