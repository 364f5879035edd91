//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod audit;
mod document;
mod grant;
mod reconciliation;
mod subject;

pub use access::{
    AccessBasis, AccessDecision, DocumentAccessFilter, can_access, can_modify, evaluate_access,
};
pub use audit::AuditAction;
pub use document::{Document, DocumentId, DocumentVisibility};
pub use grant::{
    GrantId, GrantKind, GrantStatus, GrantTarget, GrantWindow, PermissionGrant,
    PermissionGrantInput,
};
pub use reconciliation::{needs_expiry, reconcile};
pub use subject::{ADMINISTRATOR_ROLE, RoleName, Subject, UserId};
