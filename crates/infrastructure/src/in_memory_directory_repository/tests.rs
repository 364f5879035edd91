use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use docvault_application::{DocumentRepository, PermissionGrantRepository, SubjectRepository};
use docvault_core::AppError;
use docvault_domain::{
    Document, DocumentId, DocumentVisibility, GrantKind, PermissionGrant, PermissionGrantInput,
    RoleName, Subject, UserId,
};

use super::InMemoryDirectoryRepository;
use crate::InMemoryPermissionGrantRepository;

fn directory() -> InMemoryDirectoryRepository {
    InMemoryDirectoryRepository::new(Arc::new(InMemoryPermissionGrantRepository::new()))
}

fn role(value: &str) -> RoleName {
    RoleName::new(value).unwrap_or_else(|_| unreachable!())
}

fn document_for(owner: &Subject, visibility: DocumentVisibility) -> Document {
    Document::new(
        DocumentId::new(),
        "Policy",
        owner.user_id(),
        owner.role().clone(),
        visibility,
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn reads_reflect_current_owner_role() {
    let repository = directory();
    let owner = Subject::new(UserId::new(), role("EDITOR"), false);
    assert!(repository.save_subject(owner.clone()).await.is_ok());
    let document = document_for(&owner, DocumentVisibility::RoleBased);
    assert!(repository.save_document(document.clone()).await.is_ok());

    assert!(
        repository
            .save_subject(Subject::new(owner.user_id(), role("MANAGER"), false))
            .await
            .is_ok()
    );

    let found = repository
        .find_document(document.document_id())
        .await
        .ok()
        .flatten();
    assert_eq!(
        found.map(|document| document.owner_role().as_str().to_owned()),
        Some("MANAGER".to_owned())
    );
}

#[tokio::test]
async fn save_document_rejects_unknown_owner_and_duplicates() {
    let repository = directory();
    let stranger = Subject::new(UserId::new(), role("USER"), false);
    assert!(matches!(
        repository
            .save_document(document_for(&stranger, DocumentVisibility::Private))
            .await,
        Err(AppError::NotFound(_))
    ));

    assert!(repository.save_subject(stranger.clone()).await.is_ok());
    let document = document_for(&stranger, DocumentVisibility::Private);
    assert!(repository.save_document(document.clone()).await.is_ok());
    assert!(matches!(
        repository.save_document(document).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn update_visibility_and_delete() {
    let repository = directory();
    let owner = Subject::new(UserId::new(), role("USER"), false);
    assert!(repository.save_subject(owner.clone()).await.is_ok());
    let document = document_for(&owner, DocumentVisibility::Private);
    assert!(repository.save_document(document.clone()).await.is_ok());

    let updated = repository
        .update_visibility(document.document_id(), DocumentVisibility::Public)
        .await;
    assert_eq!(
        updated.ok().map(|document| document.visibility()),
        Some(DocumentVisibility::Public)
    );
    assert!(matches!(
        repository
            .update_visibility(DocumentId::new(), DocumentVisibility::Public)
            .await,
        Err(AppError::NotFound(_))
    ));

    assert!(matches!(
        repository.delete_document(document.document_id()).await,
        Ok(Some(0))
    ));
    assert!(matches!(
        repository.delete_document(document.document_id()).await,
        Ok(None)
    ));
    let remaining = repository.list_documents().await.unwrap_or_default();
    assert!(remaining.is_empty());
}

fn grant_on(document: &Document, user_id: UserId) -> PermissionGrant {
    let start = DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_500);
    PermissionGrant::new(
        PermissionGrantInput {
            document_id: document.document_id(),
            kind: GrantKind::User,
            user_id: Some(user_id),
            role: None,
            start_time: start,
            end_time: start + Duration::hours(1),
        },
        start,
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn delete_document_cascades_into_linked_grant_store() {
    let grants = Arc::new(InMemoryPermissionGrantRepository::new());
    let repository = InMemoryDirectoryRepository::new(grants.clone());
    let owner = Subject::new(UserId::new(), role("USER"), false);
    assert!(repository.save_subject(owner.clone()).await.is_ok());
    let document = document_for(&owner, DocumentVisibility::Private);
    let other = document_for(&owner, DocumentVisibility::Private);
    assert!(repository.save_document(document.clone()).await.is_ok());
    assert!(repository.save_document(other.clone()).await.is_ok());
    for stored in [
        grant_on(&document, owner.user_id()),
        grant_on(&document, owner.user_id()),
    ] {
        assert!(grants.create_grant(stored).await.is_ok());
    }
    let kept = grant_on(&other, owner.user_id());
    assert!(grants.create_grant(kept.clone()).await.is_ok());

    let removed = repository.delete_document(document.document_id()).await;

    assert!(matches!(removed, Ok(Some(2))));
    assert!(
        grants
            .grants_for_document(document.document_id())
            .await
            .unwrap_or_default()
            .is_empty()
    );
    assert_eq!(
        grants
            .grants_for_document(other.document_id())
            .await
            .unwrap_or_default(),
        vec![kept]
    );
}
