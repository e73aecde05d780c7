use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Class of an issued token, carried in the `type` claim.
///
/// Access tokens authorize individual requests; refresh tokens are
/// exchangeable for a new token pair and are the only class persisted
/// (as a digest) on the session side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

/// Claims carried by a signed session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Token identifier, random per issuance. Two tokens minted for the
    /// same subject in the same second still serialize to distinct strings.
    pub jti: String,

    /// Token class
    #[serde(rename = "type")]
    pub class: TokenClass,
}

impl Claims {
    /// Build claims for a token issued at `issued_at`, expiring at
    /// `issued_at + ttl`.
    ///
    /// # Arguments
    /// * `subject` - User identifier placed in `sub`
    /// * `class` - Token class placed in `type`
    /// * `issued_at` - Issue instant, supplied by the caller's clock
    /// * `ttl` - Time until expiry
    pub fn new(
        subject: impl ToString,
        class: TokenClass,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            exp: (issued_at + ttl).timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            class,
        }
    }

    /// Check whether the token is expired at `now` (Unix timestamp).
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp < now
    }
}
