use std::sync::Arc;

use chrono::{DateTime, Utc};
use docvault_core::{AppError, AppResult};
use docvault_domain::{
    AuditAction, GrantId, GrantKind, GrantTarget, GrantWindow, PermissionGrant,
    PermissionGrantInput, Subject, UserId, reconcile,
};

use crate::ports::{
    AuditEvent, AuditRepository, Clock, DocumentRepository, GrantListQuery,
    PermissionGrantRepository, SubjectRepository,
};

/// Input payload for administrative grant edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePermissionGrantInput {
    /// Grant kind.
    pub kind: GrantKind,
    /// Target user; required for user grants, forbidden for role grants.
    pub user_id: Option<UserId>,
    /// Target role; required for role grants, forbidden for user grants.
    pub role: Option<String>,
    /// Inclusive window start.
    pub start_time: DateTime<Utc>,
    /// Exclusive window end.
    pub end_time: DateTime<Utc>,
}

/// Application service for administrator-managed permission grants.
///
/// Writes reconcile eagerly, so a grant saved with a window that already
/// ended is stored expired. Reads reconcile lazily in memory.
#[derive(Clone)]
pub struct PermissionAdminService {
    grant_repository: Arc<dyn PermissionGrantRepository>,
    document_repository: Arc<dyn DocumentRepository>,
    subject_repository: Arc<dyn SubjectRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl PermissionAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        grant_repository: Arc<dyn PermissionGrantRepository>,
        document_repository: Arc<dyn DocumentRepository>,
        subject_repository: Arc<dyn SubjectRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            grant_repository,
            document_repository,
            subject_repository,
            audit_repository,
            clock,
        }
    }

    /// Creates a grant and emits an audit event.
    pub async fn create_grant(
        &self,
        actor: &Subject,
        input: PermissionGrantInput,
    ) -> AppResult<PermissionGrant> {
        require_administrator(actor)?;

        let now = self.clock.now();
        let grant = PermissionGrant::new(input, now)?;
        self.require_references(&grant).await?;

        let grant = self
            .grant_repository
            .create_grant(reconcile(&grant, now))
            .await?;

        self.audit(
            actor,
            AuditAction::PermissionGrantCreated,
            &grant,
            format!(
                "granted {} access on document '{}' from '{}' until '{}'",
                describe_target(grant.target()),
                grant.document_id(),
                grant.window().start_time().to_rfc3339(),
                grant.window().end_time().to_rfc3339()
            ),
        )
        .await?;

        Ok(grant)
    }

    /// Edits the target and window of a grant and emits an audit event.
    ///
    /// An expired grant stays expired whatever the new window; re-granting
    /// requires a new record.
    pub async fn update_grant(
        &self,
        actor: &Subject,
        grant_id: GrantId,
        input: UpdatePermissionGrantInput,
    ) -> AppResult<PermissionGrant> {
        require_administrator(actor)?;

        let now = self.clock.now();
        let existing = reconcile(&self.load_grant(grant_id).await?, now);
        let target = GrantTarget::from_parts(input.kind, input.user_id, input.role.as_deref())?;
        let window = GrantWindow::new(input.start_time, input.end_time)?;

        let edited = existing.edited(target, window, now);
        self.require_references(&edited).await?;

        let grant = self
            .grant_repository
            .update_grant(reconcile(&edited, now))
            .await?;

        self.audit(
            actor,
            AuditAction::PermissionGrantUpdated,
            &grant,
            format!(
                "updated grant to {} until '{}' (status '{}')",
                describe_target(grant.target()),
                grant.window().end_time().to_rfc3339(),
                grant.status().as_str()
            ),
        )
        .await?;

        Ok(grant)
    }

    /// Revokes a grant. Revoking an unknown grant is a silent no-op.
    pub async fn revoke_grant(&self, actor: &Subject, grant_id: GrantId) -> AppResult<()> {
        require_administrator(actor)?;

        let existing = self.grant_repository.find_grant(grant_id).await?;
        let removed = self.grant_repository.delete_grant(grant_id).await?;

        if let (true, Some(grant)) = (removed, existing) {
            self.audit(
                actor,
                AuditAction::PermissionGrantRevoked,
                &grant,
                format!(
                    "revoked {} access on document '{}'",
                    describe_target(grant.target()),
                    grant.document_id()
                ),
            )
            .await?;
        }

        Ok(())
    }

    /// Returns one grant with its status reconciled against now.
    pub async fn find_grant(
        &self,
        actor: &Subject,
        grant_id: GrantId,
    ) -> AppResult<Option<PermissionGrant>> {
        require_administrator(actor)?;

        let now = self.clock.now();
        Ok(self
            .grant_repository
            .find_grant(grant_id)
            .await?
            .map(|grant| reconcile(&grant, now)))
    }

    /// Lists grants with their status reconciled against now.
    pub async fn list_grants(
        &self,
        actor: &Subject,
        query: GrantListQuery,
    ) -> AppResult<Vec<PermissionGrant>> {
        require_administrator(actor)?;

        let now = self.clock.now();
        Ok(self
            .grant_repository
            .list_grants(query, now)
            .await?
            .iter()
            .map(|grant| reconcile(grant, now))
            .collect())
    }

    async fn load_grant(&self, grant_id: GrantId) -> AppResult<PermissionGrant> {
        self.grant_repository
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}' does not exist")))
    }

    async fn require_references(&self, grant: &PermissionGrant) -> AppResult<()> {
        if self
            .document_repository
            .find_document(grant.document_id())
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "document '{}' does not exist",
                grant.document_id()
            )));
        }

        if let Some(user_id) = grant.target().user_id() {
            let subject = self.subject_repository.find_subject(user_id).await?;
            if subject.is_none() {
                return Err(AppError::NotFound(format!(
                    "subject '{user_id}' does not exist"
                )));
            }
        }

        Ok(())
    }

    async fn audit(
        &self,
        actor: &Subject,
        action: AuditAction,
        grant: &PermissionGrant,
        detail: String,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id().to_string(),
                action,
                resource_type: "permission_grant".to_owned(),
                resource_id: grant.grant_id().to_string(),
                detail: Some(detail),
            })
            .await
    }
}

fn require_administrator(actor: &Subject) -> AppResult<()> {
    if actor.is_administrator() {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "subject '{}' is not allowed to manage permission grants",
        actor.user_id()
    )))
}

fn describe_target(target: &GrantTarget) -> String {
    match target {
        GrantTarget::User(user_id) => format!("user '{user_id}'"),
        GrantTarget::Role(role) => format!("role '{role}'"),
    }
}
