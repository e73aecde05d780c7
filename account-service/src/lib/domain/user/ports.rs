use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::user::errors::AuthError;
use crate::user::models::RegisterCommand;
use crate::user::models::Session;
use crate::user::models::SessionId;
use crate::user::models::TokenPair;
use crate::user::models::User;
use crate::user::models::UserId;

/// Port for the authentication engine, consumed by the request layer.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new account and issue its first token pair.
    ///
    /// # Arguments
    /// * `command` - Validated command containing display name, email, and password
    ///
    /// # Returns
    /// Fresh access/refresh token pair
    ///
    /// # Errors
    /// * `AlreadyExists` - A non-deleted account already holds the email
    /// * `Database` - Store operation failed
    async fn register(&self, command: RegisterCommand) -> Result<TokenPair, AuthError>;

    /// Authenticate by email and password and issue a token pair.
    ///
    /// Stamps the account's last-login time on success.
    ///
    /// # Arguments
    /// * `email` - Login email address
    /// * `password` - Plaintext password
    ///
    /// # Returns
    /// Fresh access/refresh token pair
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password; the two
    ///   causes are not distinguishable to the caller
    /// * `NotActive` - Password is correct but the account status blocks access
    /// * `Database` - Store operation failed
    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Exchange a refresh token for a new token pair.
    ///
    /// The consumed session is revoked and its replacement recorded as one
    /// atomic unit, so each refresh token is usable at most once.
    ///
    /// # Arguments
    /// * `refresh_token` - Raw refresh token string
    ///
    /// # Returns
    /// Fresh access/refresh token pair
    ///
    /// # Errors
    /// * `InvalidToken` - Signature/expiry failure, wrong token class, no
    ///   matching active session, or the session was concurrently consumed;
    ///   the causes are not distinguishable to the caller
    /// * `NotActive` - Token is valid but the owning account is not active
    /// * `Database` - Store operation failed
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;

    /// Revoke every active session of a user.
    ///
    /// A no-op when the user has no active sessions.
    ///
    /// # Arguments
    /// * `user_id` - Owner whose sessions are revoked
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError>;

    /// Resolve a raw access token to the current account.
    ///
    /// Checks signature, class, expiry, and that the subject is an active,
    /// non-deleted account. Every failure collapses to `InvalidToken` so
    /// the response surface leaks no account state.
    ///
    /// # Arguments
    /// * `token` - Raw access token string
    ///
    /// # Returns
    /// The authenticated user entity
    ///
    /// # Errors
    /// * `InvalidToken` - Any verification failure
    /// * `Database` - Store operation failed
    async fn verify_access_token(&self, token: &str) -> Result<User, AuthError>;
}

/// Persistence port for accounts and their refresh sessions.
///
/// The two tables live behind one port because every engine operation must
/// hit the store as a single atomic unit, and register/refresh span both.
/// Compound methods are each one transaction in the adapter.
#[async_trait]
pub trait AuthRepository: Send + Sync + 'static {
    /// Retrieve a non-deleted user by email address.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Retrieve a non-deleted user by identifier.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Persist a new user and their first refresh session in one
    /// transaction.
    ///
    /// # Errors
    /// * `AlreadyExists` - A non-deleted account already holds the email
    /// * `Database` - Store operation failed
    async fn create_user(&self, user: User, session: Session) -> Result<(), AuthError>;

    /// Stamp a user's last-login time and record their fresh session in
    /// one transaction.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn record_login(
        &self,
        user_id: &UserId,
        logged_in_at: DateTime<Utc>,
        session: Session,
    ) -> Result<(), AuthError>;

    /// Insert a new active session row.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn record_session(&self, session: Session) -> Result<(), AuthError>;

    /// Retrieve the session matching a token digest, only if it is
    /// unrevoked and unexpired at `now`.
    ///
    /// This lookup is the sole authorization check for refresh-token
    /// reuse.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn find_active_session(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError>;

    /// Atomically revoke the consumed session and record its replacement.
    ///
    /// The revocation is guarded: when the consumed session was already
    /// revoked by a concurrent caller, nothing is written and `false` is
    /// returned. This guard is what makes a refresh token single-use under
    /// races.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn rotate_session(
        &self,
        consumed: &SessionId,
        revoked_at: DateTime<Utc>,
        replacement: Session,
    ) -> Result<bool, AuthError>;

    /// Revoke a single session. Idempotent: revoking an already-revoked
    /// session is a no-op, not an error.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn revoke_session(&self, id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Revoke every active session of a user in one statement.
    ///
    /// Atomic with respect to concurrent `find_active_session` calls: a
    /// session is observed either fully active or fully revoked.
    ///
    /// # Errors
    /// * `Database` - Store operation failed
    async fn revoke_all_for_user(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;
}

/// Clock capability injected into the engine.
///
/// Each logical operation reads the clock exactly once and threads that
/// instant through every comparison and write, so tests can simulate
/// expiry deterministically.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
