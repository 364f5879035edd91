mod audit;
mod clock;
mod directory;
mod grants;

pub use audit::{AuditEvent, AuditRepository};
pub use clock::Clock;
pub use directory::{DocumentRepository, SubjectRepository};
pub use grants::{GrantListQuery, PermissionGrantRepository};
