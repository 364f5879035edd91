use chrono::{DateTime, Duration, Utc};
use docvault_application::{
    DocumentRepository, GrantListQuery, PermissionGrantRepository, SubjectRepository,
};
use docvault_core::AppError;
use docvault_domain::{
    Document, DocumentId, DocumentVisibility, GrantKind, GrantStatus, PermissionGrant,
    PermissionGrantInput, RoleName, Subject, UserId,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::PostgresPermissionGrantRepository;
use crate::PostgresDirectoryRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres grant tests: {error}");
    }

    Some(pool)
}

fn base_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_500)
}

async fn seed_document(directory: &PostgresDirectoryRepository) -> (Subject, Document) {
    let owner = Subject::new(
        UserId::new(),
        RoleName::new("EDITOR").unwrap_or_else(|_| unreachable!()),
        false,
    );
    assert!(directory.save_subject(owner.clone()).await.is_ok());

    let document = Document::new(
        DocumentId::new(),
        "Quarterly report",
        owner.user_id(),
        owner.role().clone(),
        DocumentVisibility::Private,
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(directory.save_document(document.clone()).await.is_ok());

    (owner, document)
}

fn user_grant(document: &Document, user_id: UserId, hours: i64) -> PermissionGrant {
    PermissionGrant::new(
        PermissionGrantInput {
            document_id: document.document_id(),
            kind: GrantKind::User,
            user_id: Some(user_id),
            role: None,
            start_time: base_time(),
            end_time: base_time() + Duration::hours(hours),
        },
        base_time(),
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn create_find_and_duplicate_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let directory = PostgresDirectoryRepository::new(pool.clone());
    let repository = PostgresPermissionGrantRepository::new(pool);
    let (owner, document) = seed_document(&directory).await;
    let grant = user_grant(&document, owner.user_id(), 1);

    assert!(repository.create_grant(grant.clone()).await.is_ok());

    let found = repository.find_grant(grant.grant_id()).await;
    assert_eq!(found.ok().flatten(), Some(grant.clone()));

    let duplicate = repository.create_grant(grant).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn list_status_filter_uses_reconciled_status() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let directory = PostgresDirectoryRepository::new(pool.clone());
    let repository = PostgresPermissionGrantRepository::new(pool);
    let (owner, document) = seed_document(&directory).await;
    let short = user_grant(&document, owner.user_id(), 1);
    let long = user_grant(&document, owner.user_id(), 10);
    assert!(repository.create_grant(short.clone()).await.is_ok());
    assert!(repository.create_grant(long.clone()).await.is_ok());

    let as_of = base_time() + Duration::hours(2);
    let expired = repository
        .list_grants(
            GrantListQuery {
                document_id: Some(document.document_id()),
                status: Some(GrantStatus::Expired),
                limit: 50,
                ..GrantListQuery::default()
            },
            as_of,
        )
        .await
        .unwrap_or_default();
    let active = repository
        .list_grants(
            GrantListQuery {
                document_id: Some(document.document_id()),
                status: Some(GrantStatus::Active),
                limit: 50,
                ..GrantListQuery::default()
            },
            as_of,
        )
        .await
        .unwrap_or_default();

    assert_eq!(
        expired
            .iter()
            .map(PermissionGrant::grant_id)
            .collect::<Vec<_>>(),
        vec![short.grant_id()]
    );
    assert_eq!(
        active
            .iter()
            .map(PermissionGrant::grant_id)
            .collect::<Vec<_>>(),
        vec![long.grant_id()]
    );
}

#[tokio::test]
async fn mark_grant_expired_transitions_once() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let directory = PostgresDirectoryRepository::new(pool.clone());
    let repository = PostgresPermissionGrantRepository::new(pool);
    let (owner, document) = seed_document(&directory).await;
    let grant = user_grant(&document, owner.user_id(), 1);
    assert!(repository.create_grant(grant.clone()).await.is_ok());

    let now = base_time() + Duration::hours(2);
    let stale = repository
        .list_active_grants_ended_before(now, 10_000)
        .await
        .unwrap_or_default();
    let grant_id = grant.grant_id();
    assert!(stale.iter().any(|stored| stored.grant_id() == grant_id));

    let first = repository.mark_grant_expired(grant.grant_id(), now).await;
    let second = repository.mark_grant_expired(grant.grant_id(), now).await;
    assert!(matches!(first, Ok(true)));
    assert!(matches!(second, Ok(false)));

    let stored = repository.find_grant(grant.grant_id()).await;
    assert_eq!(
        stored.ok().flatten().map(|stored| stored.status()),
        Some(GrantStatus::Expired)
    );
}

#[tokio::test]
async fn delete_is_idempotent_and_document_delete_cascades() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let directory = PostgresDirectoryRepository::new(pool.clone());
    let repository = PostgresPermissionGrantRepository::new(pool);
    let (owner, document) = seed_document(&directory).await;
    let first = user_grant(&document, owner.user_id(), 1);
    let second = user_grant(&document, owner.user_id(), 2);
    assert!(repository.create_grant(first.clone()).await.is_ok());
    assert!(repository.create_grant(second.clone()).await.is_ok());

    let deleted = repository.delete_grant(first.grant_id()).await;
    let deleted_again = repository.delete_grant(first.grant_id()).await;
    assert!(matches!(deleted, Ok(true)));
    assert!(matches!(deleted_again, Ok(false)));

    assert!(matches!(
        directory.delete_document(document.document_id()).await,
        Ok(Some(1))
    ));
    let remaining = repository
        .grants_for_document(document.document_id())
        .await
        .unwrap_or_default();
    assert!(remaining.is_empty());
    let cascaded = repository.find_grant(second.grant_id()).await;
    assert!(matches!(cascaded, Ok(None)));
}
