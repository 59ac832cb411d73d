// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant scoping for storage operations.
//!
//! Every query module captures a [`TenantScope`] from the ambient tenant
//! carrier *before* moving work onto the SQLite writer thread (the
//! task-local does not cross that boundary). Scoped reads conjoin
//! `(?scope IS NULL OR workspace_id = ?scope)` into their filter; scoped
//! writes stamp the workspace id from the scope, overriding any
//! caller-supplied value, so a caller can never forge a cross-tenant write
//! while a context is active.

use tidings_core::{current_workspace, TidingsError, WorkspaceId};

/// The tenant scope captured for one storage operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope(Option<WorkspaceId>);

impl TenantScope {
    /// Capture the ambient tenant context. `None` when no context is
    /// active, which makes reads unscoped.
    pub fn ambient() -> Self {
        Self(current_workspace())
    }

    /// An explicitly unscoped operation.
    ///
    /// Used only by the workspace resolver and the status reconciler's
    /// cross-tenant lookups by provider message id.
    pub fn unscoped() -> Self {
        Self(None)
    }

    pub fn workspace(&self) -> Option<&WorkspaceId> {
        self.0.as_ref()
    }

    /// SQL filter parameter for `(?n IS NULL OR workspace_id = ?n)`.
    pub fn param(&self) -> Option<String> {
        self.0.as_ref().map(|w| w.0.clone())
    }

    /// Workspace id to stamp onto an inserted row.
    ///
    /// The active scope always wins over `fallback`; `fallback` is used for
    /// unscoped inserts where the caller supplies the value directly (e.g.
    /// an outbound send with no known tenant).
    pub fn stamp(&self, fallback: Option<&str>) -> Result<String, TidingsError> {
        match (&self.0, fallback) {
            (Some(ws), _) => Ok(ws.0.clone()),
            (None, Some(id)) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(TidingsError::Internal(
                "no tenant context active and no workspace id supplied".to_string(),
            )),
        }
    }
}
