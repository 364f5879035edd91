use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use docvault_application::{AuditEvent, AuditRepository};
use docvault_core::{AppError, AppResult};

const SYSTEM_ACTOR_PREFIX: &str = "system:";

/// PostgreSQL-backed append-only audit log for access-control changes.
///
/// Every row records whether it was written on behalf of a user or by a
/// background process, so expiry sweeps can be told apart from
/// administrator edits without parsing the actor column.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Classifies an audit actor as `user` (a user id) or `system` (a
/// `system:<name>` label).
fn actor_kind(actor: &str) -> AppResult<&'static str> {
    if let Some(name) = actor.strip_prefix(SYSTEM_ACTOR_PREFIX) {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "system audit actor must carry a process name".to_owned(),
            ));
        }

        return Ok("system");
    }

    if Uuid::parse_str(actor).is_err() {
        return Err(AppError::Validation(format!(
            "audit actor '{actor}' is neither a user id nor a system label"
        )));
    }

    Ok("user")
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let kind = actor_kind(event.actor.as_str())?;

        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                actor,
                actor_kind,
                action,
                resource_type,
                resource_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.actor.as_str())
        .bind(kind)
        .bind(event.action.as_str())
        .bind(event.resource_type.as_str())
        .bind(event.resource_id.as_str())
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        debug!(
            action = event.action.as_str(),
            actor_kind = kind,
            resource_id = %event.resource_id,
            "appended audit event"
        );

        Ok(())
    }
}
