//! Acting subjects: user identifiers, role labels and the administrator flag.

use docvault_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role label that marks a subject as an administrator by convention.
pub const ADMINISTRATOR_ROLE: &str = "ADMIN";

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
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

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Free-form role label compared verbatim (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleName(NonEmptyString);

impl RoleName {
    /// Creates a validated role label.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the role label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Entity on whose behalf an access decision is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    user_id: UserId,
    role: RoleName,
    is_administrator: bool,
}

impl Subject {
    /// Creates a subject with an explicit administrator flag.
    #[must_use]
    pub fn new(user_id: UserId, role: RoleName, is_administrator: bool) -> Self {
        Self {
            user_id,
            role,
            is_administrator,
        }
    }

    /// Creates a subject whose administrator flag follows the `ADMIN` role convention.
    #[must_use]
    pub fn from_role(user_id: UserId, role: RoleName) -> Self {
        let is_administrator = role.as_str() == ADMINISTRATOR_ROLE;
        Self::new(user_id, role, is_administrator)
    }

    /// Returns the subject identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the subject role label.
    #[must_use]
    pub fn role(&self) -> &RoleName {
        &self.role
    }

    /// Returns whether the subject bypasses all grant checks.
    #[must_use]
    pub fn is_administrator(&self) -> bool {
        self.is_administrator
    }
}
