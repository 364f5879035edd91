//! Batch sweep persisting grant expiry.
//!
//! Access decisions never depend on this sweep: every read reconciles in
//! memory. The sweep only keeps stored rows from accumulating stale
//! `active` statuses.

use std::sync::Arc;

use docvault_core::{AppError, AppResult};
use docvault_domain::{AuditAction, GrantStatus, reconcile};

use crate::ports::{AuditEvent, AuditRepository, Clock, PermissionGrantRepository};

/// Actor label recorded on audit events emitted by the sweep.
pub const RECONCILER_ACTOR: &str = "system:reconciler";

/// Counters produced by one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconciliationReport {
    /// Stale active grants inspected.
    pub scanned: u64,
    /// Grants transitioned to expired.
    pub expired: u64,
}

/// Application service running reconciliation sweeps over the grant store.
#[derive(Clone)]
pub struct GrantReconciliationService {
    grant_repository: Arc<dyn PermissionGrantRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl GrantReconciliationService {
    /// Creates a new service. `batch_size` must be greater than zero.
    pub fn new(
        grant_repository: Arc<dyn PermissionGrantRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        clock: Arc<dyn Clock>,
        batch_size: usize,
    ) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Validation(
                "reconciliation batch_size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            grant_repository,
            audit_repository,
            clock,
            batch_size,
        })
    }

    /// Expires every stored grant that is still active past its window.
    ///
    /// Each grant is updated with its own single-row write. A batch that
    /// makes no progress ends the sweep.
    pub async fn sweep(&self) -> AppResult<ReconciliationReport> {
        let now = self.clock.now();
        let mut report = ReconciliationReport::default();

        loop {
            let batch = self
                .grant_repository
                .list_active_grants_ended_before(now, self.batch_size)
                .await?;
            let batch_len = batch.len();
            let mut expired_in_batch = 0_u64;

            for grant in batch {
                report.scanned = report.scanned.saturating_add(1);

                let reconciled = reconcile(&grant, now);
                if reconciled.status() != GrantStatus::Expired {
                    continue;
                }

                if !self
                    .grant_repository
                    .mark_grant_expired(grant.grant_id(), now)
                    .await?
                {
                    continue;
                }

                expired_in_batch = expired_in_batch.saturating_add(1);
                self.audit_repository
                    .append_event(AuditEvent {
                        actor: RECONCILER_ACTOR.to_owned(),
                        action: AuditAction::PermissionGrantExpired,
                        resource_type: "permission_grant".to_owned(),
                        resource_id: grant.grant_id().to_string(),
                        detail: Some(format!(
                            "expired grant on document '{}' ended at '{}'",
                            grant.document_id(),
                            grant.window().end_time().to_rfc3339()
                        )),
                    })
                    .await?;
            }

            report.expired = report.expired.saturating_add(expired_in_batch);

            if batch_len < self.batch_size || expired_in_batch == 0 {
                return Ok(report);
            }
        }
    }
}
