//! Audit action identifiers recorded by administrative operations.

use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by administrative use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a permission grant is created.
    PermissionGrantCreated,
    /// Emitted when a permission grant window or target is edited.
    PermissionGrantUpdated,
    /// Emitted when a permission grant is revoked.
    PermissionGrantRevoked,
    /// Emitted when the reconciliation sweep persists an expiry.
    PermissionGrantExpired,
    /// Emitted when a document visibility tier changes.
    DocumentVisibilityChanged,
    /// Emitted when a document and its grants are deleted.
    DocumentDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionGrantCreated => "permission.grant.created",
            Self::PermissionGrantUpdated => "permission.grant.updated",
            Self::PermissionGrantRevoked => "permission.grant.revoked",
            Self::PermissionGrantExpired => "permission.grant.expired",
            Self::DocumentVisibilityChanged => "document.visibility.changed",
            Self::DocumentDeleted => "document.deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuditAction;

    #[test]
    fn storage_values_are_namespaced() {
        assert_eq!(
            AuditAction::PermissionGrantExpired.as_str(),
            "permission.grant.expired"
        );
        let deleted = AuditAction::DocumentDeleted.as_str();
        assert!(deleted.starts_with("document."));
    }
}
