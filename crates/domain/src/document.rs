//! Document records and their visibility tiers.

use std::str::FromStr;

use docvault_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::{RoleName, UserId};

/// Unique identifier for a document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new random document identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a document identifier from an existing UUID value.
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

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Visibility tier of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentVisibility {
    /// Visible to the owner, administrators and grant holders.
    #[default]
    Private,
    /// Additionally visible to subjects sharing the owner's role.
    RoleBased,
    /// Visible to every subject.
    Public,
}

impl DocumentVisibility {
    /// Returns a stable storage value for this visibility.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::RoleBased => "ROLE_BASED",
            Self::Public => "PUBLIC",
        }
    }
}

impl FromStr for DocumentVisibility {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PRIVATE" => Ok(Self::Private),
            "ROLE_BASED" => Ok(Self::RoleBased),
            "PUBLIC" => Ok(Self::Public),
            _ => Err(AppError::Validation(format!(
                "unknown document visibility '{value}'"
            ))),
        }
    }
}

/// Document attributes relevant to access decisions.
///
/// `owner_role` is the owner's role as resolved by the store when the
/// document is read, so it follows role changes of the owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    document_id: DocumentId,
    title: NonEmptyString,
    owner_id: UserId,
    owner_role: RoleName,
    visibility: DocumentVisibility,
}

impl Document {
    /// Creates a validated document record.
    pub fn new(
        document_id: DocumentId,
        title: impl Into<String>,
        owner_id: UserId,
        owner_role: RoleName,
        visibility: DocumentVisibility,
    ) -> AppResult<Self> {
        Ok(Self {
            document_id,
            title: NonEmptyString::new(title)?,
            owner_id,
            owner_role,
            visibility,
        })
    }

    /// Returns the document identifier.
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// Returns the document title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the owning user.
    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Returns the owner's role.
    #[must_use]
    pub fn owner_role(&self) -> &RoleName {
        &self.owner_role
    }

    /// Returns the visibility tier.
    #[must_use]
    pub fn visibility(&self) -> DocumentVisibility {
        self.visibility
    }

    /// Returns a copy with another visibility tier.
    #[must_use]
    pub fn with_visibility(mut self, visibility: DocumentVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Returns a copy carrying the owner's current role.
    #[must_use]
    pub fn with_owner_role(mut self, owner_role: RoleName) -> Self {
        self.owner_role = owner_role;
        self
    }
}
