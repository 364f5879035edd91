use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use docvault_application::{GrantListQuery, PermissionGrantRepository};
use docvault_core::{AppError, AppResult};
use docvault_domain::{
    DocumentId, GrantId, GrantKind, GrantStatus, GrantTarget, GrantWindow, PermissionGrant,
    RoleName, UserId,
};

/// PostgreSQL-backed repository for permission grants.
#[derive(Clone)]
pub struct PostgresPermissionGrantRepository {
    pool: PgPool,
}

impl PostgresPermissionGrantRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionGrantRow {
    grant_id: Uuid,
    document_id: Uuid,
    kind: String,
    user_id: Option<Uuid>,
    role: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionGrantRow {
    fn into_grant(self) -> AppResult<PermissionGrant> {
        let decode_error = |error: AppError| {
            AppError::Internal(format!(
                "failed to decode permission grant '{}': {error}",
                self.grant_id
            ))
        };

        let kind = GrantKind::from_str(self.kind.as_str()).map_err(decode_error)?;
        let status = GrantStatus::from_str(self.status.as_str()).map_err(decode_error)?;
        let target = GrantTarget::from_parts(
            kind,
            self.user_id.map(UserId::from_uuid),
            self.role.as_deref(),
        )
        .map_err(decode_error)?;
        let window = GrantWindow::new(self.start_time, self.end_time).map_err(decode_error)?;

        Ok(PermissionGrant::restore(
            GrantId::from_uuid(self.grant_id),
            DocumentId::from_uuid(self.document_id),
            target,
            window,
            status,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn decode_rows(rows: Vec<PermissionGrantRow>) -> AppResult<Vec<PermissionGrant>> {
    rows.into_iter()
        .map(PermissionGrantRow::into_grant)
        .collect()
}

fn limit_to_i64(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

const GRANT_COLUMNS: &str = r#"
    id AS grant_id,
    document_id,
    kind,
    user_id,
    role,
    start_time,
    end_time,
    status,
    created_at,
    updated_at
"#;

#[async_trait]
impl PermissionGrantRepository for PostgresPermissionGrantRepository {
    async fn grants_for_document(
        &self,
        document_id: DocumentId,
    ) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM permission_grants
            WHERE document_id = $1
            ORDER BY created_at, id
            "#
        ))
        .bind(document_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load grants for document '{document_id}': {error}"
            ))
        })?;

        decode_rows(rows)
    }

    async fn grants_for_subject(
        &self,
        user_id: UserId,
        role: &RoleName,
    ) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM permission_grants
            WHERE (kind = 'user' AND user_id = $1)
               OR (kind = 'role' AND role = $2)
            ORDER BY created_at, id
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load grants for subject '{user_id}': {error}"
            ))
        })?;

        decode_rows(rows)
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<PermissionGrant>> {
        let row = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM permission_grants
            WHERE id = $1
            "#
        ))
        .bind(grant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find grant '{grant_id}': {error}"))
        })?;

        row.map(PermissionGrantRow::into_grant).transpose()
    }

    async fn list_grants(
        &self,
        query: GrantListQuery,
        as_of: DateTime<Utc>,
    ) -> AppResult<Vec<PermissionGrant>> {
        let capped_limit = query.limit.clamp(1, 200) as i64;
        let capped_offset = limit_to_i64(query.offset);
        let rows = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM permission_grants
            WHERE ($1::UUID IS NULL OR document_id = $1)
                AND ($2::UUID IS NULL OR user_id = $2)
                AND ($3::TEXT IS NULL OR role = $3)
                AND ($4::TEXT IS NULL OR kind = $4)
                AND (
                    $5::TEXT IS NULL
                    OR ($5 = 'expired' AND (status = 'expired' OR end_time < $6))
                    OR ($5 = 'active' AND status = 'active' AND end_time >= $6)
                )
            ORDER BY created_at DESC, id DESC
            LIMIT $7
            OFFSET $8
            "#
        ))
        .bind(query.document_id.map(|document_id| document_id.as_uuid()))
        .bind(query.user_id.map(|user_id| user_id.as_uuid()))
        .bind(query.role.as_ref().map(RoleName::as_str))
        .bind(query.kind.map(|kind| kind.as_str()))
        .bind(query.status.map(|status| status.as_str()))
        .bind(as_of)
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list grants: {error}")))?;

        decode_rows(rows)
    }

    async fn create_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant> {
        let result = sqlx::query(
            r#"
            INSERT INTO permission_grants (
                id,
                document_id,
                kind,
                user_id,
                role,
                start_time,
                end_time,
                status,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(grant.grant_id().as_uuid())
        .bind(grant.document_id().as_uuid())
        .bind(grant.kind().as_str())
        .bind(grant.target().user_id().map(|user_id| user_id.as_uuid()))
        .bind(grant.target().role().map(RoleName::as_str))
        .bind(grant.window().start_time())
        .bind(grant.window().end_time())
        .bind(grant.status().as_str())
        .bind(grant.created_at())
        .bind(grant.updated_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(grant),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "grant '{}' already exists",
                        grant.grant_id()
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to create grant '{}': {error}",
                    grant.grant_id()
                )))
            }
        }
    }

    async fn update_grant(&self, grant: PermissionGrant) -> AppResult<PermissionGrant> {
        let result = sqlx::query(
            r#"
            UPDATE permission_grants
            SET kind = $2,
                user_id = $3,
                role = $4,
                start_time = $5,
                end_time = $6,
                status = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(grant.grant_id().as_uuid())
        .bind(grant.kind().as_str())
        .bind(grant.target().user_id().map(|user_id| user_id.as_uuid()))
        .bind(grant.target().role().map(RoleName::as_str))
        .bind(grant.window().start_time())
        .bind(grant.window().end_time())
        .bind(grant.status().as_str())
        .bind(grant.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update grant '{}': {error}",
                grant.grant_id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "grant '{}' does not exist",
                grant.grant_id()
            )));
        }

        Ok(grant)
    }

    async fn delete_grant(&self, grant_id: GrantId) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM permission_grants
            WHERE id = $1
            "#,
        )
        .bind(grant_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete grant '{grant_id}': {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active_grants_ended_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, PermissionGrantRow>(&format!(
            r#"
            SELECT {GRANT_COLUMNS}
            FROM permission_grants
            WHERE status = 'active'
              AND end_time < $1
            ORDER BY end_time, id
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit_to_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list stale active grants: {error}"))
        })?;

        decode_rows(rows)
    }

    async fn mark_grant_expired(&self, grant_id: GrantId, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE permission_grants
            SET status = 'expired'
            WHERE id = $1
              AND status = 'active'
              AND end_time < $2
            "#,
        )
        .bind(grant_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to expire grant '{grant_id}': {error}"))
        })?;

        let transitioned = result.rows_affected() > 0;
        if !transitioned {
            debug!(grant_id = %grant_id, "grant already reconciled by another writer");
        }

        Ok(transitioned)
    }
}

#[cfg(test)]
mod tests;
