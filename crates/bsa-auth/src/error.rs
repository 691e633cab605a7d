//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// Token verification never produces one of these: an unusable token is
/// reported as "no session" instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Signing secret missing, empty or unusable.
    #[error("session configuration error: {0}")]
    Config(String),

    /// TTL is zero or too large to express in milliseconds.
    #[error("invalid session TTL: {0} seconds")]
    InvalidTtl(u64),

    /// Cookie name or value contains characters a `Set-Cookie` header cannot carry.
    #[error("invalid cookie: {0}")]
    InvalidCookie(String),

    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
