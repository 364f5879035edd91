//! The document access rule.
//!
//! Rules are checked in order and the first match decides:
//! administrator, owner, public visibility, owner role for role-based
//! documents, then any effective grant. The model is additive only; no
//! grant can take access away.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentId, DocumentVisibility};
use crate::grant::{GrantId, PermissionGrant};
use crate::reconciliation::reconcile;
use crate::subject::Subject;

/// Rule that granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "basis", content = "grant_id", rename_all = "snake_case")]
pub enum AccessBasis {
    /// Subject is an administrator.
    Administrator,
    /// Subject owns the document.
    Owner,
    /// Document is public.
    PublicVisibility,
    /// Document is role-based and the subject shares the owner's role.
    OwnerRole,
    /// An effective permission grant covers the subject.
    Grant(GrantId),
}

/// Outcome of an access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Access is granted on the given basis.
    Granted(AccessBasis),
    /// No rule matched.
    Denied,
}

impl AccessDecision {
    /// Returns whether access was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Decides whether `subject` may access `document` at `now`.
///
/// Grants attached to other documents are ignored. Each grant is reconciled
/// in memory before use; nothing is written back.
pub fn evaluate_access<'a>(
    subject: &Subject,
    document: &Document,
    grants: impl IntoIterator<Item = &'a PermissionGrant>,
    now: DateTime<Utc>,
) -> AccessDecision {
    if subject.is_administrator() {
        return AccessDecision::Granted(AccessBasis::Administrator);
    }

    if document.owner_id() == subject.user_id() {
        return AccessDecision::Granted(AccessBasis::Owner);
    }

    match document.visibility() {
        DocumentVisibility::Public => {
            return AccessDecision::Granted(AccessBasis::PublicVisibility);
        }
        // Compares against the owner's role; documents carry no role of their own.
        DocumentVisibility::RoleBased if document.owner_role() == subject.role() => {
            return AccessDecision::Granted(AccessBasis::OwnerRole);
        }
        DocumentVisibility::RoleBased | DocumentVisibility::Private => {}
    }

    grants
        .into_iter()
        .filter(|grant| grant.document_id() == document.document_id())
        .map(|grant| reconcile(grant, now))
        .find(|grant| grant.grants_access_to(subject, now))
        .map(|grant| AccessDecision::Granted(AccessBasis::Grant(grant.grant_id())))
        .unwrap_or(AccessDecision::Denied)
}

/// Boolean form of [`evaluate_access`].
pub fn can_access<'a>(
    subject: &Subject,
    document: &Document,
    grants: impl IntoIterator<Item = &'a PermissionGrant>,
    now: DateTime<Utc>,
) -> bool {
    evaluate_access(subject, document, grants, now).is_granted()
}

/// Returns whether `subject` may change or delete `document`.
#[must_use]
pub fn can_modify(subject: &Subject, document: &Document) -> bool {
    subject.is_administrator() || document.owner_id() == subject.user_id()
}

/// Predicate applying the access rule to any document for one subject and instant.
#[derive(Debug, Clone)]
pub struct DocumentAccessFilter {
    subject: Subject,
    now: DateTime<Utc>,
    grants_by_document: HashMap<DocumentId, Vec<PermissionGrant>>,
}

impl DocumentAccessFilter {
    /// Creates a filter from every grant that may target the subject.
    #[must_use]
    pub fn new(
        subject: Subject,
        grants: impl IntoIterator<Item = PermissionGrant>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut grants_by_document: HashMap<DocumentId, Vec<PermissionGrant>> = HashMap::new();
        for grant in grants {
            grants_by_document
                .entry(grant.document_id())
                .or_default()
                .push(grant);
        }

        Self {
            subject,
            now,
            grants_by_document,
        }
    }

    /// Returns the subject the filter evaluates for.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Returns the evaluation instant.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Returns the decision for one document.
    #[must_use]
    pub fn decide(&self, document: &Document) -> AccessDecision {
        let grants = self
            .grants_by_document
            .get(&document.document_id())
            .into_iter()
            .flatten();

        evaluate_access(&self.subject, document, grants, self.now)
    }

    /// Returns whether the subject may access the document.
    #[must_use]
    pub fn allows(&self, document: &Document) -> bool {
        self.decide(document).is_granted()
    }
}
