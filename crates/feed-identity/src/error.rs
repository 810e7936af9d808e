//! Error types for authentication.

use thiserror::Error;

/// Errors produced while authenticating callers or issuing tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("username or password is incorrect")]
    InvalidCredentials,

    /// The token is malformed or its signature does not match.
    #[error("invalid token")]
    InvalidToken,

    /// The token was valid but its lifetime has elapsed.
    #[error("token expired")]
    TokenExpired,

    /// A username was registered twice.
    #[error("username already taken: {0}")]
    DuplicateUsername(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),
}
