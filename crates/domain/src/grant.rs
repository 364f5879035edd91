//! Time-boxed permission grants attached to a document.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use docvault_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentId;
use crate::subject::{RoleName, Subject, UserId};

/// Unique identifier for a permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Who a grant is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Grant targets one user.
    User,
    /// Grant targets every subject holding a role.
    Role,
}

impl GrantKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
        }
    }
}

impl FromStr for GrantKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "role" => Ok(Self::Role),
            _ => Err(AppError::Validation(format!(
                "unknown grant kind '{value}'"
            ))),
        }
    }
}

/// Cached lifecycle status of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Grant may yield access inside its window.
    Active,
    /// Grant window has passed; terminal.
    Expired,
}

impl GrantStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for GrantStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown grant status '{value}'"
            ))),
        }
    }
}

/// Target of a grant. Exactly one of user or role is always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum GrantTarget {
    /// One specific user.
    User(UserId),
    /// All subjects holding the role.
    Role(RoleName),
}

impl GrantTarget {
    /// Builds a target from loosely typed fields, enforcing that only the
    /// field matching `kind` is populated. A blank role still counts as
    /// populated.
    pub fn from_parts(
        kind: GrantKind,
        user_id: Option<UserId>,
        role: Option<&str>,
    ) -> AppResult<Self> {
        match (kind, user_id, role) {
            (GrantKind::User, Some(user_id), None) => Ok(Self::User(user_id)),
            (GrantKind::Role, None, Some(role)) => Ok(Self::Role(RoleName::new(role)?)),
            (GrantKind::User, _, _) => Err(AppError::Validation(
                "user grants require a target user and no target role".to_owned(),
            )),
            (GrantKind::Role, _, _) => Err(AppError::Validation(
                "role grants require a target role and no target user".to_owned(),
            )),
        }
    }

    /// Returns the grant kind implied by this target.
    #[must_use]
    pub fn kind(&self) -> GrantKind {
        match self {
            Self::User(_) => GrantKind::User,
            Self::Role(_) => GrantKind::Role,
        }
    }

    /// Returns the targeted user, for user grants.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(user_id) => Some(*user_id),
            Self::Role(_) => None,
        }
    }

    /// Returns the targeted role, for role grants.
    #[must_use]
    pub fn role(&self) -> Option<&RoleName> {
        match self {
            Self::User(_) => None,
            Self::Role(role) => Some(role),
        }
    }

    /// Returns whether the subject is covered by this target.
    #[must_use]
    pub fn matches(&self, subject: &Subject) -> bool {
        match self {
            Self::User(user_id) => *user_id == subject.user_id(),
            Self::Role(role) => role == subject.role(),
        }
    }
}

/// Half-open validity window `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantWindow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl GrantWindow {
    /// Creates a window, rejecting empty or inverted ranges.
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> AppResult<Self> {
        if start_time >= end_time {
            return Err(AppError::Validation(format!(
                "grant start_time '{}' must be before end_time '{}'",
                start_time.to_rfc3339(),
                end_time.to_rfc3339()
            )));
        }

        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Returns the inclusive start instant.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Returns the exclusive end instant.
    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Returns whether `now` lies inside the window.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    /// Returns whether the window closed strictly before `now`.
    #[must_use]
    pub fn has_ended_before(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// Loosely typed payload used to create a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrantInput {
    /// Document the grant is attached to.
    pub document_id: DocumentId,
    /// Grant kind.
    pub kind: GrantKind,
    /// Target user; required for user grants, forbidden for role grants.
    pub user_id: Option<UserId>,
    /// Target role; required for role grants, forbidden for user grants.
    pub role: Option<String>,
    /// Inclusive window start.
    pub start_time: DateTime<Utc>,
    /// Exclusive window end.
    pub end_time: DateTime<Utc>,
}

/// Permission grant record owned by its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    grant_id: GrantId,
    document_id: DocumentId,
    target: GrantTarget,
    window: GrantWindow,
    status: GrantStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionGrant {
    /// Validates creation input into a new active grant.
    pub fn new(input: PermissionGrantInput, created_at: DateTime<Utc>) -> AppResult<Self> {
        let target = GrantTarget::from_parts(input.kind, input.user_id, input.role.as_deref())?;
        let window = GrantWindow::new(input.start_time, input.end_time)?;

        Ok(Self {
            grant_id: GrantId::new(),
            document_id: input.document_id,
            target,
            window,
            status: GrantStatus::Active,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rebuilds a grant from persisted parts.
    #[must_use]
    pub fn restore(
        grant_id: GrantId,
        document_id: DocumentId,
        target: GrantTarget,
        window: GrantWindow,
        status: GrantStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            grant_id,
            document_id,
            target,
            window,
            status,
            created_at,
            updated_at,
        }
    }

    /// Returns the grant identifier.
    #[must_use]
    pub fn grant_id(&self) -> GrantId {
        self.grant_id
    }

    /// Returns the owning document.
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// Returns the grant target.
    #[must_use]
    pub fn target(&self) -> &GrantTarget {
        &self.target
    }

    /// Returns the grant kind.
    #[must_use]
    pub fn kind(&self) -> GrantKind {
        self.target.kind()
    }

    /// Returns the validity window.
    #[must_use]
    pub fn window(&self) -> GrantWindow {
        self.window
    }

    /// Returns the cached status.
    #[must_use]
    pub fn status(&self) -> GrantStatus {
        self.status
    }

    /// Returns the creation instant.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification instant.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether this grant yields access to `subject` at `now`.
    ///
    /// Reads the cached status as-is; callers reconcile first.
    #[must_use]
    pub fn grants_access_to(&self, subject: &Subject, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active
            && self.window.contains(now)
            && self.target.matches(subject)
    }

    /// Applies an administrative edit of target and window.
    ///
    /// The status is left untouched: an expired grant stays expired.
    #[must_use]
    pub fn edited(
        mut self,
        target: GrantTarget,
        window: GrantWindow,
        updated_at: DateTime<Utc>,
    ) -> Self {
        self.target = target;
        self.window = window;
        self.updated_at = updated_at;
        self
    }

    pub(crate) fn into_expired(mut self) -> Self {
        self.status = GrantStatus::Expired;
        self
    }
}
