use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenClass;
use auth::TokenCodec;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::user::errors::AuthError;
use crate::user::models::RegisterCommand;
use crate::user::models::Session;
use crate::user::models::SessionId;
use crate::user::models::TokenPair;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::models::UserStatus;
use crate::user::ports::AuthRepository;
use crate::user::ports::AuthServicePort;
use crate::user::ports::Clock;

/// Authentication engine.
///
/// Owns the session lifecycle invariants: single-use refresh rotation,
/// revoke-all on logout, and expiry checks against a single per-operation
/// instant. Stateless apart from the injected collaborators, so one
/// instance serves concurrent requests.
pub struct AuthService<R, C>
where
    R: AuthRepository,
    C: Clock,
{
    repository: Arc<R>,
    tokens: TokenCodec,
    password_hasher: PasswordHasher,
    clock: C,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl<R, C> AuthService<R, C>
where
    R: AuthRepository,
    C: Clock,
{
    /// Create a new authentication engine with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Account/session persistence implementation
    /// * `tokens` - Session token codec built from the configured signing key
    /// * `clock` - Time source read once per operation
    /// * `access_ttl` - Lifetime of issued access tokens
    /// * `refresh_ttl` - Lifetime of issued refresh tokens
    pub fn new(
        repository: Arc<R>,
        tokens: TokenCodec,
        clock: C,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            tokens,
            password_hasher: PasswordHasher::new(),
            clock,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Mint a token pair and the session row carrying the refresh token's
    /// digest. The only producer of raw token strings; callers persist the
    /// returned session in the same store transaction as their other
    /// writes. Raw tokens are never logged.
    fn issue_session(&self, user: &User, now: DateTime<Utc>) -> Result<(TokenPair, Session), AuthError> {
        let subject = user.id.to_string();

        let access_token = self
            .tokens
            .issue(&subject, TokenClass::Access, now, self.access_ttl)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))?;
        let refresh_token = self
            .tokens
            .issue(&subject, TokenClass::Refresh, now, self.refresh_ttl)
            .map_err(|e| AuthError::TokenIssuance(e.to_string()))?;

        let session = Session {
            id: SessionId::new(),
            user_id: user.id,
            token_digest: TokenCodec::hash_for_storage(&refresh_token),
            expires_at: now + self.refresh_ttl,
            revoked_at: None,
            created_at: now,
        };

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            session,
        ))
    }
}

#[async_trait]
impl<R, C> AuthServicePort for AuthService<R, C>
where
    R: AuthRepository,
    C: Clock,
{
    async fn register(&self, command: RegisterCommand) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();

        if self
            .repository
            .find_user_by_email(command.email.as_str())
            .await?
            .is_some()
        {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.password_hasher.hash(&command.password)?;

        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            password_hash,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            deleted_at: None,
        };
        let user_id = user.id;

        let (pair, session) = self.issue_session(&user, now)?;
        // A concurrent registration of the same email loses the race inside
        // the store and surfaces as AlreadyExists.
        self.repository.create_user(user, session).await?;

        tracing::info!(user_id = %user_id, "Account registered");

        Ok(pair)
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();

        let user = match self.repository.find_user_by_email(email).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials),
        };

        if !self.password_hasher.verify(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active() {
            return Err(AuthError::NotActive);
        }

        let (pair, session) = self.issue_session(&user, now)?;
        self.repository.record_login(&user.id, now, session).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(pair)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();

        let claims = self
            .tokens
            .verify(refresh_token, now)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.class != TokenClass::Refresh {
            return Err(AuthError::InvalidToken);
        }

        let digest = TokenCodec::hash_for_storage(refresh_token);
        let session = self
            .repository
            .find_active_session(&digest, now)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let user = self
            .repository
            .find_user_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active() {
            return Err(AuthError::NotActive);
        }

        let (pair, replacement) = self.issue_session(&user, now)?;
        let rotated = self
            .repository
            .rotate_session(&session.id, now, replacement)
            .await?;

        if !rotated {
            // Lost the race against another caller holding the same token.
            tracing::warn!(
                user_id = %user.id,
                session_id = %session.id,
                "Refresh token already consumed"
            );
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(user_id = %user.id, session_id = %session.id, "Session rotated");

        Ok(pair)
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError> {
        let now = self.clock.now();

        self.repository.revoke_all_for_user(user_id, now).await?;

        tracing::info!(user_id = %user_id, "All sessions revoked");

        Ok(())
    }

    async fn verify_access_token(&self, token: &str) -> Result<User, AuthError> {
        let now = self.clock.now();

        let claims = self
            .tokens
            .verify(token, now)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.class != TokenClass::Access {
            return Err(AuthError::InvalidToken);
        }

        let user_id = UserId::from_string(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .repository
            .find_user_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        // Banned and soft-deleted accounts collapse into the same generic
        // failure as a bad signature; the response surface must not reveal
        // account state.
        if !user.is_active() {
            return Err(AuthError::InvalidToken);
        }

        Ok(user)
    }
}
