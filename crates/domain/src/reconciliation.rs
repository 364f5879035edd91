//! Status reconciliation keeping the cached grant status consistent with time.

use chrono::{DateTime, Utc};

use crate::grant::{GrantStatus, PermissionGrant};

/// Returns the grant with its status normalized against `now`.
///
/// An active grant whose window ended strictly before `now` becomes expired.
/// Every other grant is returned unchanged; expired grants never reactivate.
#[must_use]
pub fn reconcile(grant: &PermissionGrant, now: DateTime<Utc>) -> PermissionGrant {
    if needs_expiry(grant, now) {
        return grant.clone().into_expired();
    }

    grant.clone()
}

/// Returns whether [`reconcile`] would transition the grant.
#[must_use]
pub fn needs_expiry(grant: &PermissionGrant, now: DateTime<Utc>) -> bool {
    grant.status() == GrantStatus::Active && grant.window().has_ended_before(now)
}
