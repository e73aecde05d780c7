use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for Username validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsernameError {
    #[error("Display name must not be empty")]
    Empty,

    #[error("Display name too long: maximum {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for UserStatus parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserStatusError {
    #[error("Unknown user status: {0}")]
    Unknown(String),
}

/// Top-level error for all authentication operations.
///
/// The first four variants are the caller-recoverable conditions. Two of
/// them merge their causes: `InvalidCredentials` covers both unknown email
/// and wrong password, and `InvalidToken` covers malformed, expired,
/// revoked, and unknown tokens. The merging is an enumeration-resistance
/// invariant; callers must not be able to probe account state through the
/// error kind.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("An account with this email already exists")]
    AlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account is not active")]
    NotActive,

    // Value object validation errors (automatically converted via #[from]),
    // raised when reconstructing domain values from stored rows
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("Invalid display name: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid user status: {0}")]
    InvalidStatus(#[from] UserStatusError),

    // Engine-internal failures
    #[error("Password error: {0}")]
    Password(#[from] auth::PasswordError),

    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),
}
