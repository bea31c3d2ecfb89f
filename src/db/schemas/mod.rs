//! MongoDB document schemas for grants, users, groups, and audit events.

mod audit_event;
mod grant;
mod group;
mod metadata;
mod user;

pub use audit_event::{AuditEventDoc, AUDIT_EVENT_COLLECTION};
pub use grant::{GrantDoc, GRANT_COLLECTION};
pub use group::{GroupDoc, GROUP_COLLECTION};
pub use metadata::Metadata;
pub use user::{UserDoc, USER_COLLECTION};
