//! Authentication infrastructure library
//!
//! Provides the credential primitives for the account service:
//! - Password hashing (Argon2id)
//! - Signed session token issuance and verification
//! - Deterministic storage digests for refresh tokens
//!
//! The service defines its own ports and lifecycle rules and adapts these
//! implementations. Nothing here touches a store or a clock: the caller
//! injects every instant, which keeps token expiry deterministic in tests.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! assert!(!hasher.verify("not_my_password", &hash));
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::{TokenClass, TokenCodec};
//! use chrono::{Duration, Utc};
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!");
//! let now = Utc::now();
//!
//! let token = codec
//!     .issue("user123", TokenClass::Access, now, Duration::minutes(30))
//!     .unwrap();
//! let claims = codec.verify(&token, now).unwrap();
//! assert_eq!(claims.sub, "user123");
//! assert_eq!(claims.class, TokenClass::Access);
//! ```

pub mod password;
pub mod token;

// Re-export commonly used items
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::Claims;
pub use token::TokenClass;
pub use token::TokenCodec;
pub use token::TokenError;
