use std::sync::Arc;

use chrono::{DateTime, Utc};
use docvault_core::{AppError, AppResult};
use docvault_domain::{
    AccessDecision, Document, DocumentAccessFilter, DocumentId, PermissionGrant, Subject, UserId,
    evaluate_access,
};

use crate::ports::{Clock, DocumentRepository, PermissionGrantRepository, SubjectRepository};

/// Application service answering document access questions.
#[derive(Clone)]
pub struct PermissionEvaluator {
    grant_repository: Arc<dyn PermissionGrantRepository>,
    document_repository: Arc<dyn DocumentRepository>,
    subject_repository: Arc<dyn SubjectRepository>,
    clock: Arc<dyn Clock>,
}

impl PermissionEvaluator {
    /// Creates a new evaluator from required dependencies.
    #[must_use]
    pub fn new(
        grant_repository: Arc<dyn PermissionGrantRepository>,
        document_repository: Arc<dyn DocumentRepository>,
        subject_repository: Arc<dyn SubjectRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            grant_repository,
            document_repository,
            subject_repository,
            clock,
        }
    }

    /// Returns whether the subject may access the document now.
    pub async fn can_access(&self, subject_id: UserId, document_id: DocumentId) -> AppResult<bool> {
        self.can_access_at(subject_id, document_id, self.clock.now())
            .await
    }

    /// Returns whether the subject may access the document at `now`.
    pub async fn can_access_at(
        &self,
        subject_id: UserId,
        document_id: DocumentId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let subject = self.load_subject(subject_id).await?;
        let document = self.load_document(document_id).await?;

        Ok(self.decide(&subject, &document, now).await?.is_granted())
    }

    /// Ensures the subject may access the document now.
    pub async fn require_access(
        &self,
        subject_id: UserId,
        document_id: DocumentId,
    ) -> AppResult<AccessDecision> {
        let subject = self.load_subject(subject_id).await?;
        let document = self.load_document(document_id).await?;
        let decision = self.decide(&subject, &document, self.clock.now()).await?;

        if !decision.is_granted() {
            return Err(AppError::Forbidden(format!(
                "subject '{subject_id}' may not access document '{document_id}'"
            )));
        }

        Ok(decision)
    }

    /// Decides access for already resolved records.
    ///
    /// Grants are only fetched when no unconditional rule matched.
    pub async fn decide(
        &self,
        subject: &Subject,
        document: &Document,
        now: DateTime<Utc>,
    ) -> AppResult<AccessDecision> {
        let unconditional = evaluate_access(
            subject,
            document,
            std::iter::empty::<&PermissionGrant>(),
            now,
        );
        if unconditional.is_granted() {
            return Ok(unconditional);
        }

        let grants = self
            .grant_repository
            .grants_for_document(document.document_id())
            .await?;

        Ok(evaluate_access(subject, document, &grants, now))
    }

    /// Builds a predicate that applies the access rule to any document.
    pub async fn access_filter(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> AppResult<DocumentAccessFilter> {
        let grants = if subject.is_administrator() {
            Vec::new()
        } else {
            self.grant_repository
                .grants_for_subject(subject.user_id(), subject.role())
                .await?
        };

        Ok(DocumentAccessFilter::new(subject.clone(), grants, now))
    }

    /// Lists every document the subject may access now.
    pub async fn list_accessible_documents(&self, subject_id: UserId) -> AppResult<Vec<Document>> {
        let subject = self.load_subject(subject_id).await?;
        let filter = self.access_filter(&subject, self.clock.now()).await?;

        Ok(self
            .document_repository
            .list_documents()
            .await?
            .into_iter()
            .filter(|document| filter.allows(document))
            .collect())
    }

    async fn load_subject(&self, subject_id: UserId) -> AppResult<Subject> {
        self.subject_repository
            .find_subject(subject_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subject '{subject_id}' does not exist")))
    }

    async fn load_document(&self, document_id: DocumentId) -> AppResult<Document> {
        self.document_repository
            .find_document(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document '{document_id}' does not exist")))
    }
}
