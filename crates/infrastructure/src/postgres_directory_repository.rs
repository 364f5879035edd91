use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use docvault_application::{DocumentRepository, SubjectRepository};
use docvault_core::{AppError, AppResult};
use docvault_domain::{Document, DocumentId, DocumentVisibility, RoleName, Subject, UserId};

/// PostgreSQL-backed repository for documents and subjects.
///
/// Document reads join the owner's current role from `subjects`.
#[derive(Clone)]
pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    document_id: Uuid,
    title: String,
    owner_id: Uuid,
    owner_role: String,
    visibility: String,
}

impl DocumentRow {
    fn into_document(self) -> AppResult<Document> {
        let document_id = self.document_id;
        let decode_error = |error: AppError| {
            AppError::Internal(format!(
                "failed to decode document '{document_id}': {error}"
            ))
        };

        let visibility =
            DocumentVisibility::from_str(self.visibility.as_str()).map_err(decode_error)?;
        let owner_role = RoleName::new(self.owner_role).map_err(decode_error)?;

        Document::new(
            DocumentId::from_uuid(self.document_id),
            self.title,
            UserId::from_uuid(self.owner_id),
            owner_role,
            visibility,
        )
        .map_err(decode_error)
    }
}

#[derive(Debug, FromRow)]
struct SubjectRow {
    user_id: Uuid,
    role: String,
    is_administrator: bool,
}

#[async_trait]
impl DocumentRepository for PostgresDirectoryRepository {
    async fn find_document(&self, document_id: DocumentId) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT
                documents.id AS document_id,
                documents.title,
                documents.owner_id,
                owners.role AS owner_role,
                documents.visibility
            FROM documents
            INNER JOIN subjects AS owners
                ON owners.id = documents.owner_id
            WHERE documents.id = $1
            "#,
        )
        .bind(document_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find document '{document_id}': {error}"))
        })?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn list_documents(&self) -> AppResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT
                documents.id AS document_id,
                documents.title,
                documents.owner_id,
                owners.role AS owner_role,
                documents.visibility
            FROM documents
            INNER JOIN subjects AS owners
                ON owners.id = documents.owner_id
            ORDER BY documents.created_at, documents.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list documents: {error}")))?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn save_document(&self, document: Document) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (id, title, owner_id, visibility)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM subjects WHERE id = $3)
            "#,
        )
        .bind(document.document_id().as_uuid())
        .bind(document.title())
        .bind(document.owner_id().as_uuid())
        .bind(document.visibility().as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(AppError::NotFound(format!(
                "owner '{}' does not exist",
                document.owner_id()
            ))),
            Ok(_) => Ok(()),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "document '{}' already exists",
                        document.document_id()
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to save document '{}': {error}",
                    document.document_id()
                )))
            }
        }
    }

    async fn update_visibility(
        &self,
        document_id: DocumentId,
        visibility: DocumentVisibility,
    ) -> AppResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            WITH updated AS (
                UPDATE documents
                SET visibility = $2
                WHERE id = $1
                RETURNING id, title, owner_id, visibility
            )
            SELECT
                updated.id AS document_id,
                updated.title,
                updated.owner_id,
                owners.role AS owner_role,
                updated.visibility
            FROM updated
            INNER JOIN subjects AS owners
                ON owners.id = updated.owner_id
            "#,
        )
        .bind(document_id.as_uuid())
        .bind(visibility.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update visibility of document '{document_id}': {error}"
            ))
        })?;

        let Some(row) = row else {
            return Err(AppError::NotFound(format!(
                "document '{document_id}' does not exist"
            )));
        };

        row.into_document()
    }

    async fn delete_document(&self, document_id: DocumentId) -> AppResult<Option<u64>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start document delete transaction: {error}"
            ))
        })?;

        let grants = sqlx::query(
            r#"
            DELETE FROM permission_grants
            WHERE document_id = $1
            "#,
        )
        .bind(document_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete grants for document '{document_id}': {error}"
            ))
        })?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE id = $1
            "#,
        )
        .bind(document_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete document '{document_id}': {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit document delete transaction: {error}"
            ))
        })?;

        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        info!(
            document_id = %document_id,
            grants_removed = grants.rows_affected(),
            "document deleted"
        );

        Ok(Some(grants.rows_affected()))
    }
}

#[async_trait]
impl SubjectRepository for PostgresDirectoryRepository {
    async fn find_subject(&self, user_id: UserId) -> AppResult<Option<Subject>> {
        let row = sqlx::query_as::<_, SubjectRow>(
            r#"
            SELECT id AS user_id, role, is_administrator
            FROM subjects
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find subject '{user_id}': {error}"))
        })?;

        row.map(|row| {
            let role = RoleName::new(row.role).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode role for subject '{}': {error}",
                    row.user_id
                ))
            })?;
            Ok(Subject::new(
                UserId::from_uuid(row.user_id),
                role,
                row.is_administrator,
            ))
        })
        .transpose()
    }

    async fn save_subject(&self, subject: Subject) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subjects (id, role, is_administrator)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET role = EXCLUDED.role,
                is_administrator = EXCLUDED.is_administrator
            "#,
        )
        .bind(subject.user_id().as_uuid())
        .bind(subject.role().as_str())
        .bind(subject.is_administrator())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save subject '{}': {error}",
                subject.user_id()
            ))
        })?;

        Ok(())
    }
}
