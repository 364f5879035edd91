use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use docvault_application::{DocumentRepository, SubjectRepository};
use docvault_core::{AppError, AppResult};
use docvault_domain::{Document, DocumentId, DocumentVisibility, Subject, UserId};

use crate::InMemoryPermissionGrantRepository;

/// In-memory document and subject directory.
///
/// Document reads carry the owner's current role, so a role change on the
/// subject is visible to the next access check. Deleting a document removes
/// its grants from the linked grant store while both tables are locked.
pub struct InMemoryDirectoryRepository {
    documents: RwLock<HashMap<DocumentId, Document>>,
    subjects: RwLock<HashMap<UserId, Subject>>,
    grants: Arc<InMemoryPermissionGrantRepository>,
}

impl InMemoryDirectoryRepository {
    /// Creates an empty directory whose document deletes cascade into
    /// `grants`.
    #[must_use]
    pub fn new(grants: Arc<InMemoryPermissionGrantRepository>) -> Self {
        Self {
            documents: RwLock::default(),
            subjects: RwLock::default(),
            grants,
        }
    }

    async fn with_current_owner_role(&self, document: Document) -> AppResult<Document> {
        let subjects = self.subjects.read().await;
        let Some(owner) = subjects.get(&document.owner_id()) else {
            return Err(AppError::Internal(format!(
                "owner '{}' of document '{}' is missing",
                document.owner_id(),
                document.document_id()
            )));
        };

        let owner_role = owner.role().clone();
        Ok(document.with_owner_role(owner_role))
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDirectoryRepository {
    async fn find_document(&self, document_id: DocumentId) -> AppResult<Option<Document>> {
        let document = self.documents.read().await.get(&document_id).cloned();
        match document {
            Some(document) => self.with_current_owner_role(document).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let mut documents: Vec<Document> = self.documents.read().await.values().cloned().collect();
        documents.sort_by_key(Document::document_id);

        let mut resolved = Vec::with_capacity(documents.len());
        for document in documents {
            resolved.push(self.with_current_owner_role(document).await?);
        }

        Ok(resolved)
    }

    async fn save_document(&self, document: Document) -> AppResult<()> {
        if !self
            .subjects
            .read()
            .await
            .contains_key(&document.owner_id())
        {
            return Err(AppError::NotFound(format!(
                "owner '{}' does not exist",
                document.owner_id()
            )));
        }

        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.document_id()) {
            return Err(AppError::Conflict(format!(
                "document '{}' already exists",
                document.document_id()
            )));
        }

        documents.insert(document.document_id(), document);
        Ok(())
    }

    async fn update_visibility(
        &self,
        document_id: DocumentId,
        visibility: DocumentVisibility,
    ) -> AppResult<Document> {
        let updated = {
            let mut documents = self.documents.write().await;
            let Some(document) = documents.remove(&document_id) else {
                return Err(AppError::NotFound(format!(
                    "document '{document_id}' does not exist"
                )));
            };

            let updated = document.with_visibility(visibility);
            documents.insert(document_id, updated.clone());
            updated
        };

        self.with_current_owner_role(updated).await
    }

    async fn delete_document(&self, document_id: DocumentId) -> AppResult<Option<u64>> {
        // Lock order: grants, then documents.
        let mut grants = self.grants.grants.write().await;
        let mut documents = self.documents.write().await;
        if documents.remove(&document_id).is_none() {
            return Ok(None);
        }

        let before = grants.len();
        grants.retain(|_, grant| grant.document_id() != document_id);
        Ok(Some(u64::try_from(before - grants.len()).unwrap_or(u64::MAX)))
    }
}

#[async_trait]
impl SubjectRepository for InMemoryDirectoryRepository {
    async fn find_subject(&self, user_id: UserId) -> AppResult<Option<Subject>> {
        Ok(self.subjects.read().await.get(&user_id).cloned())
    }

    async fn save_subject(&self, subject: Subject) -> AppResult<()> {
        self.subjects
            .write()
            .await
            .insert(subject.user_id(), subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
