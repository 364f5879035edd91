use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use docvault_core::{AppError, AppResult};
use docvault_domain::{
    Document, DocumentId, DocumentVisibility, GrantId, GrantKind, GrantStatus, PermissionGrant,
    PermissionGrantInput, RoleName, Subject, UserId, needs_expiry, reconcile,
};
use tokio::sync::Mutex;

use crate::ports::{
    AuditEvent, AuditRepository, Clock, DocumentRepository, GrantListQuery,
    PermissionGrantRepository, SubjectRepository,
};

pub(crate) fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_500)
}

pub(crate) struct FixedClock(pub(crate) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub(crate) grants: Mutex<Vec<PermissionGrant>>,
    pub(crate) documents: Mutex<HashMap<DocumentId, Document>>,
    pub(crate) subjects: Mutex<HashMap<UserId, Subject>>,
    pub(crate) events: Mutex<Vec<AuditEvent>>,
    pub(crate) fail_document_delete: AtomicBool,
}

impl FakeStore {
    pub(crate) async fn add_subject(&self, role: &str, is_administrator: bool) -> Subject {
        let subject = Subject::new(
            UserId::new(),
            RoleName::new(role).unwrap_or_else(|_| unreachable!()),
            is_administrator,
        );
        self.subjects
            .lock()
            .await
            .insert(subject.user_id(), subject.clone());
        subject
    }

    pub(crate) async fn add_document(
        &self,
        owner: &Subject,
        visibility: DocumentVisibility,
    ) -> Document {
        let document = Document::new(
            DocumentId::new(),
            "Contract",
            owner.user_id(),
            owner.role().clone(),
            visibility,
        )
        .unwrap_or_else(|_| unreachable!());
        self.documents
            .lock()
            .await
            .insert(document.document_id(), document.clone());
        document
    }

    pub(crate) async fn add_user_grant(
        &self,
        document: &Document,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PermissionGrant {
        let grant = PermissionGrant::new(user_grant_input(document, user_id, start, end), start)
            .unwrap_or_else(|_| unreachable!());
        self.grants.lock().await.push(grant.clone());
        grant
    }

    pub(crate) async fn has_document(&self, document_id: DocumentId) -> bool {
        self.documents.lock().await.contains_key(&document_id)
    }

    pub(crate) async fn stored_grant(&self, grant_id: GrantId) -> Option<PermissionGrant> {
        self.grants
            .lock()
            .await
            .iter()
            .find(|grant| grant.grant_id() == grant_id)
            .cloned()
    }
}

pub(crate) fn user_grant_input(
    document: &Document,
    user_id: UserId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> PermissionGrantInput {
    PermissionGrantInput {
        document_id: document.document_id(),
        kind: GrantKind::User,
        user_id: Some(user_id),
        role: None,
        start_time: start,
        end_time: end,
    }
}

#[async_trait]
impl PermissionGrantRepository for FakeStore {
    async fn grants_for_document(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| grant.document_id() == document_id)
            .cloned()
            .collect())
    }

    async fn grants_for_subject(
        &self,
        user_id: UserId,
        role: &RoleName,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| {
                grant.target().user_id() == Some(user_id) || grant.target().role() == Some(role)
            })
            .cloned()
            .collect())
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<PermissionGrant>> {
        Ok(self.stored_grant(grant_id).await)
    }

    async fn list_grants(
        &self,
        query: GrantListQuery,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| query.document_id.is_none_or(|id| grant.document_id() == id))
            .filter(|grant| query.kind.is_none_or(|kind| grant.kind() == kind))
            .filter(|grant| {
                query
                    .user_id
                    .is_none_or(|user_id| grant.target().user_id() == Some(user_id))
            })
            .filter(|grant| {
                query
                    .role
                    .as_ref()
                    .is_none_or(|role| grant.target().role() == Some(role))
            })
            .filter(|grant| {
                query
                    .status
                    .is_none_or(|status| reconcile(grant, as_of).status() == status)
            })
            .skip(query.offset)
            .take(query.limit.clamp(1, 200))
            .cloned()
            .collect())
    }

    async fn create_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant> {
        let mut grants = self.grants.lock().await;
        let grant_id = grant.grant_id();
        if grants.iter().any(|stored| stored.grant_id() == grant_id) {
            return Err(AppError::Conflict(format!(
                "grant '{grant_id}' already exists"
            )));
        }
        grants.push(grant.clone());
        Ok(grant)
    }

    async fn update_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant> {
        let mut grants = self.grants.lock().await;
        let Some(stored) = grants
            .iter_mut()
            .find(|stored| stored.grant_id() == grant.grant_id())
        else {
            return Err(AppError::NotFound(format!(
                "grant '{}' does not exist",
                grant.grant_id()
            )));
        };
        *stored = grant.clone();
        Ok(grant)
    }

    async fn delete_grant(&self, grant_id: GrantId) -> AppResult<bool> {
        let mut grants = self.grants.lock().await;
        let before = grants.len();
        grants.retain(|grant| grant.grant_id() != grant_id);
        Ok(grants.len() != before)
    }

    async fn list_active_grants_ended_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| needs_expiry(grant, now))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_grant_expired(&self, grant_id: GrantId, now: DateTime<Utc>) -> AppResult<bool> {
        let mut grants = self.grants.lock().await;
        let Some(stored) = grants.iter_mut().find(|grant| grant.grant_id() == grant_id) else {
            return Ok(false);
        };
        if !needs_expiry(stored, now) {
            return Ok(false);
        }
        *stored = reconcile(stored, now);
        Ok(stored.status() == GrantStatus::Expired)
    }
}

#[async_trait]
impl DocumentRepository for FakeStore {
    async fn find_document(&self, document_id: DocumentId) -> AppResult<Option<Document>> {
        Ok(self.documents.lock().await.get(&document_id).cloned())
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let mut documents: Vec<Document> = self.documents.lock().await.values().cloned().collect();
        documents.sort_by_key(Document::document_id);
        Ok(documents)
    }

    async fn save_document(&self, document: Document) -> AppResult<()> {
        self.documents
            .lock()
            .await
            .insert(document.document_id(), document);
        Ok(())
    }

    async fn update_visibility(
        &self,
        document_id: DocumentId,
        visibility: DocumentVisibility,
    ) -> AppResult<Document> {
        let mut documents = self.documents.lock().await;
        let Some(document) = documents.remove(&document_id) else {
            return Err(AppError::NotFound(format!(
                "document '{document_id}' does not exist"
            )));
        };
        let updated = document.with_visibility(visibility);
        documents.insert(document_id, updated.clone());
        Ok(updated)
    }

    async fn delete_document(&self, document_id: DocumentId) -> AppResult<Option<u64>> {
        if self.fail_document_delete.load(Ordering::SeqCst) {
            return Err(AppError::Internal("document store unavailable".to_owned()));
        }

        let mut grants = self.grants.lock().await;
        let mut documents = self.documents.lock().await;
        if documents.remove(&document_id).is_none() {
            return Ok(None);
        }

        let before = grants.len();
        grants.retain(|grant| grant.document_id() != document_id);
        Ok(Some((before - grants.len()) as u64))
    }
}

#[async_trait]
impl SubjectRepository for FakeStore {
    async fn find_subject(&self, user_id: UserId) -> AppResult<Option<Subject>> {
        Ok(self.subjects.lock().await.get(&user_id).cloned())
    }

    async fn save_subject(&self, subject: Subject) -> AppResult<()> {
        self.subjects
            .lock()
            .await
            .insert(subject.user_id(), subject);
        Ok(())
    }
}

#[async_trait]
impl AuditRepository for FakeStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}
