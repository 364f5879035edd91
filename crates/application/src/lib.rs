//! Application services and ports.

#![forbid(unsafe_code)]

mod document_admin_service;
mod permission_admin_service;
mod permission_evaluator;
/// Outbound ports implemented by infrastructure adapters.
pub mod ports;
mod reconciliation_service;

#[cfg(test)]
mod test_support;

pub use document_admin_service::DocumentAdminService;
pub use permission_admin_service::{PermissionAdminService, UpdatePermissionGrantInput};
pub use permission_evaluator::PermissionEvaluator;
pub use ports::{
    AuditEvent, AuditRepository, Clock, DocumentRepository, GrantListQuery,
    PermissionGrantRepository, SubjectRepository,
};
pub use reconciliation_service::{
    GrantReconciliationService, RECONCILER_ACTOR, ReconciliationReport,
};
