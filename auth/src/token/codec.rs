use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use sha2::Digest;
use sha2::Sha256;

use super::claims::Claims;
use super::claims::TokenClass;
use super::errors::TokenError;

/// Codec for signed session tokens.
///
/// Issues and verifies the access/refresh token pair using HS256 (HMAC with
/// SHA-256). The signing key is built once from configuration; every time
/// comparison uses an instant supplied by the caller, so expiry behaves
/// deterministically under an injected clock and tolerates no skew.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl TokenCodec {
    /// Create a new codec from a symmetric signing key.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Issue a signed token for `subject`, expiring `ttl` after `issued_at`.
    ///
    /// # Arguments
    /// * `subject` - User identifier to embed
    /// * `class` - Token class (`access` or `refresh`)
    /// * `issued_at` - Issue instant from the caller's clock
    /// * `ttl` - Time until expiry
    ///
    /// # Returns
    /// Signed token string
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(
        &self,
        subject: &str,
        class: TokenClass,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(subject, class, issued_at, ttl);
        let header = Header::new(self.algorithm);

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify a token's structure, signature, and expiry.
    ///
    /// # Arguments
    /// * `token` - Token string to verify
    /// * `now` - Verification instant from the caller's clock
    ///
    /// # Returns
    /// Decoded claims
    ///
    /// # Errors
    /// * `Invalid` - Token is malformed or the signature does not check out
    /// * `Expired` - Token expiry has passed `now`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is compared against the caller's instant below, not the
        // library's view of the system clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        let claims = token_data.claims;
        if claims.is_expired(now.timestamp()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Compute the deterministic storage digest of a token.
    ///
    /// Unsalted single-pass SHA-256, hex-encoded. Used as the session
    /// lookup key so the raw refresh token is never at rest; the token is
    /// already high-entropy, so no stretching is involved.
    pub fn hash_for_storage(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
