use std::sync::Arc;

use docvault_core::{AppError, AppResult};
use docvault_domain::{AuditAction, Document, DocumentId, DocumentVisibility, Subject, can_modify};

use crate::ports::{AuditEvent, AuditRepository, DocumentRepository};

/// Application service for the document lifecycle pieces that touch access.
#[derive(Clone)]
pub struct DocumentAdminService {
    document_repository: Arc<dyn DocumentRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl DocumentAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        document_repository: Arc<dyn DocumentRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            document_repository,
            audit_repository,
        }
    }

    /// Registers a document owned by the actor.
    pub async fn create_document(
        &self,
        actor: &Subject,
        title: &str,
        visibility: DocumentVisibility,
    ) -> AppResult<Document> {
        let document = Document::new(
            DocumentId::new(),
            title,
            actor.user_id(),
            actor.role().clone(),
            visibility,
        )?;

        self.document_repository
            .save_document(document.clone())
            .await?;

        Ok(document)
    }

    /// Changes the visibility tier. Only the owner or an administrator may.
    pub async fn change_visibility(
        &self,
        actor: &Subject,
        document_id: DocumentId,
        visibility: DocumentVisibility,
    ) -> AppResult<Document> {
        let document = self.load_modifiable(actor, document_id).await?;
        let previous = document.visibility();

        let document = self
            .document_repository
            .update_visibility(document_id, visibility)
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id().to_string(),
                action: AuditAction::DocumentVisibilityChanged,
                resource_type: "document".to_owned(),
                resource_id: document_id.to_string(),
                detail: Some(format!(
                    "changed visibility from '{}' to '{}'",
                    previous.as_str(),
                    visibility.as_str()
                )),
            })
            .await?;

        Ok(document)
    }

    /// Deletes a document together with every grant attached to it.
    ///
    /// Returns the number of grants removed.
    pub async fn delete_document(
        &self,
        actor: &Subject,
        document_id: DocumentId,
    ) -> AppResult<u64> {
        self.load_modifiable(actor, document_id).await?;

        let removed_grants = self
            .document_repository
            .delete_document(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document '{document_id}' does not exist")))?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id().to_string(),
                action: AuditAction::DocumentDeleted,
                resource_type: "document".to_owned(),
                resource_id: document_id.to_string(),
                detail: Some(format!("deleted document and {removed_grants} grant(s)")),
            })
            .await?;

        Ok(removed_grants)
    }

    async fn load_modifiable(
        &self,
        actor: &Subject,
        document_id: DocumentId,
    ) -> AppResult<Document> {
        let document = self
            .document_repository
            .find_document(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document '{document_id}' does not exist")))?;

        if !can_modify(actor, &document) {
            return Err(AppError::Forbidden(format!(
                "subject '{}' may not modify document '{document_id}'",
                actor.user_id()
            )));
        }

        Ok(document)
    }
}
