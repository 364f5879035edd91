use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use docvault_application::{GrantListQuery, PermissionGrantRepository};
use docvault_core::{AppError, AppResult};
use docvault_domain::{
    DocumentId, GrantId, GrantStatus, PermissionGrant, RoleName, UserId, needs_expiry, reconcile,
};

/// In-memory grant store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryPermissionGrantRepository {
    pub(crate) grants: RwLock<HashMap<GrantId, PermissionGrant>>,
}

impl InMemoryPermissionGrantRepository {
    /// Creates an empty in-memory grant repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_oldest_first(mut grants: Vec<PermissionGrant>) -> Vec<PermissionGrant> {
    grants.sort_by_key(|grant| (grant.created_at(), grant.grant_id()));
    grants
}

fn matches_query(grant: &PermissionGrant, query: &GrantListQuery, as_of: DateTime<Utc>) -> bool {
    query
        .document_id
        .is_none_or(|document_id| grant.document_id() == document_id)
        && query
            .user_id
            .is_none_or(|user_id| grant.target().user_id() == Some(user_id))
        && query
            .role
            .as_ref()
            .is_none_or(|role| grant.target().role() == Some(role))
        && query.kind.is_none_or(|kind| grant.kind() == kind)
        && query
            .status
            .is_none_or(|status| reconcile(grant, as_of).status() == status)
}

#[async_trait]
impl PermissionGrantRepository for InMemoryPermissionGrantRepository {
    async fn grants_for_document(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<PermissionGrant>> {
        let grants = self.grants.read().await;
        Ok(sorted_oldest_first(
            grants
                .values()
                .filter(|grant| grant.document_id() == document_id)
                .cloned()
                .collect(),
        ))
    }

    async fn grants_for_subject(
        &self,
        user_id: UserId,
        role: &RoleName,
    ) -> AppResult<Vec<PermissionGrant>> {
        let grants = self.grants.read().await;
        Ok(sorted_oldest_first(
            grants
                .values()
                .filter(|grant| {
                    grant.target().user_id() == Some(user_id)
                        || grant.target().role() == Some(role)
                })
                .cloned()
                .collect(),
        ))
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<PermissionGrant>> {
        Ok(self.grants.read().await.get(&grant_id).cloned())
    }

    async fn list_grants(
        &self,
        query: GrantListQuery,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<PermissionGrant>> {
        let mut matching: Vec<PermissionGrant> = self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| matches_query(grant, &query, as_of))
            .cloned()
            .collect();
        matching.sort_by_key(|grant| std::cmp::Reverse((grant.created_at(), grant.grant_id())));

        Ok(matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.clamp(1, 200))
            .collect())
    }

    async fn create_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant> {
        let mut grants = self.grants.write().await;
        if grants.contains_key(&grant.grant_id()) {
            return Err(AppError::Conflict(format!(
                "grant '{}' already exists",
                grant.grant_id()
            )));
        }

        grants.insert(grant.grant_id(), grant.clone());
        Ok(grant)
    }

    async fn update_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant> {
        let mut grants = self.grants.write().await;
        let Some(stored) = grants.get_mut(&grant.grant_id()) else {
            return Err(AppError::NotFound(format!(
                "grant '{}' does not exist",
                grant.grant_id()
            )));
        };

        *stored = grant.clone();
        Ok(grant)
    }

    async fn delete_grant(&self, grant_id: GrantId) -> AppResult<bool> {
        Ok(self.grants.write().await.remove(&grant_id).is_some())
    }

    async fn list_active_grants_ended_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<PermissionGrant>> {
        let mut stale: Vec<PermissionGrant> = self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| needs_expiry(grant, now))
            .cloned()
            .collect();
        stale.sort_by_key(|grant| (grant.window().end_time(), grant.grant_id()));
        stale.truncate(limit);

        Ok(stale)
    }

    async fn mark_grant_expired(&self, grant_id: GrantId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut grants = self.grants.write().await;
        let Some(stored) = grants.get_mut(&grant_id) else {
            return Ok(false);
        };
        if !needs_expiry(stored, now) {
            return Ok(false);
        }

        *stored = reconcile(stored, now);
        Ok(stored.status() == GrantStatus::Expired)
    }
}
