use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docvault_core::AppResult;
use docvault_domain::{
    DocumentId, GrantId, GrantKind, GrantStatus, PermissionGrant, RoleName, UserId,
};

/// Query parameters for grant listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrantListQuery {
    /// Optional document filter.
    pub document_id: Option<DocumentId>,
    /// Optional target user filter.
    pub user_id: Option<UserId>,
    /// Optional target role filter.
    pub role: Option<RoleName>,
    /// Optional kind filter.
    pub kind: Option<GrantKind>,
    /// Optional status filter, matched against the reconciled status.
    pub status: Option<GrantStatus>,
    /// Maximum rows returned; adapters clamp to `1..=200`.
    pub limit: usize,
    /// Number of rows skipped for pagination.
    pub offset: usize,
}

/// Repository port for permission grant records.
#[async_trait]
pub trait PermissionGrantRepository: Send + Sync {
    /// Lists every grant attached to a document, of both kinds.
    async fn grants_for_document(&self, document_id: DocumentId)
    -> AppResult<Vec<PermissionGrant>>;

    /// Lists grants targeting the user directly or through the role.
    async fn grants_for_subject(
        &self,
        user_id: UserId,
        role: &RoleName,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Finds one grant by id.
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<PermissionGrant>>;

    /// Lists grants newest first.
    ///
    /// A status filter compares against the status the grant has at `as_of`,
    /// so an active row whose window ended counts as expired.
    async fn list_grants(
        &self,
        query: GrantListQuery,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Persists a new validated grant. A duplicate id is a conflict.
    async fn create_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant>;

    /// Replaces an existing grant. An unknown id is not found.
    async fn update_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant>;

    /// Deletes a grant. Unknown ids are a no-op returning `false`.
    async fn delete_grant(&self, grant_id: GrantId) -> AppResult<bool>;

    /// Lists grants still stored as active whose window ended before `now`.
    async fn list_active_grants_ended_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Marks one grant expired if it is still active and ended before `now`.
    ///
    /// Returns whether the row transitioned.
    async fn mark_grant_expired(&self, grant_id: GrantId, now: DateTime<Utc>) -> AppResult<bool>;
}
