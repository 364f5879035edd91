//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_directory_repository;
mod in_memory_permission_grant_repository;
mod postgres_audit_repository;
mod postgres_directory_repository;
mod postgres_permission_grant_repository;
mod system_clock;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_directory_repository::InMemoryDirectoryRepository;
pub use in_memory_permission_grant_repository::InMemoryPermissionGrantRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_directory_repository::PostgresDirectoryRepository;
pub use postgres_permission_grant_repository::PostgresPermissionGrantRepository;
pub use system_clock::SystemClock;
