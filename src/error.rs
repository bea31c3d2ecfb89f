//! Error taxonomy for the authorization engine.
//!
//! One variant per error kind the engine surfaces to callers, plus the two
//! plumbing variants (`Database`, `Internal`) that the business-logic kinds
//! sit on top of.

use thiserror::Error;

/// The crate's single error type.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Resource, grantee, or grant id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate grant on the (grantee, resource, permission) uniqueness key,
    /// or a membership add when already a member.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller lacks the required `manage` permission, or a self-update
    /// touched a field only a superuser may change.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown resource kind or permission, a field list on a permission
    /// that ignores fields, or `expires_at` in the past at issue time.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Store or cache timeout/connectivity failure.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Grant store (database) failure.
    #[error("database error: {0}")]
    Database(String),

    /// Anything else that should never happen given the caller honored the
    /// type system's invariants.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, WardenError>;
