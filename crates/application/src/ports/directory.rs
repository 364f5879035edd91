use async_trait::async_trait;
use docvault_core::AppResult;
use docvault_domain::{Document, DocumentId, DocumentVisibility, Subject, UserId};

/// Repository port for document records.
///
/// Documents returned by reads carry the owner's current role.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Finds one document by id.
    async fn find_document(&self, document_id: DocumentId) -> AppResult<Option<Document>>;

    /// Lists all documents.
    async fn list_documents(&self) -> AppResult<Vec<Document>>;

    /// Persists a new document. The owner must already exist.
    async fn save_document(&self, document: Document) -> AppResult<()>;

    /// Changes a document visibility tier and returns the updated record.
    async fn update_visibility(
        &self,
        document_id: DocumentId,
        visibility: DocumentVisibility,
    ) -> AppResult<Document>;

    /// Deletes a document and every grant attached to it as one storage
    /// operation.
    ///
    /// Returns the number of grants removed, or `None` when no document
    /// with that id existed.
    async fn delete_document(&self, document_id: DocumentId) -> AppResult<Option<u64>>;
}

/// Repository port for subject lookups.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Finds one subject by id.
    async fn find_subject(&self, user_id: UserId) -> AppResult<Option<Subject>>;

    /// Inserts or replaces a subject.
    async fn save_subject(&self, subject: Subject) -> AppResult<()>;
}
