use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use account_service::user::errors::AuthError;
use account_service::user::models::EmailAddress;
use account_service::user::models::RegisterCommand;
use account_service::user::models::Session;
use account_service::user::models::SessionId;
use account_service::user::models::User;
use account_service::user::models::UserId;
use account_service::user::models::UserStatus;
use account_service::user::models::Username;
use account_service::user::ports::AuthRepository;
use account_service::user::ports::Clock;
use account_service::user::service::AuthService;
use async_trait::async_trait;
use auth::TokenCodec;
use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;

pub const TEST_SECRET: &[u8] = b"integration_test_secret_32_bytes!";
pub const ACCESS_TTL_MINUTES: i64 = 30;
pub const REFRESH_TTL_DAYS: i64 = 7;

/// Controllable time source shared between a test and the engine under
/// test.
#[derive(Clone)]
pub struct TestClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    sessions: HashMap<SessionId, Session>,
}

/// In-memory stand-in for the Postgres repository.
///
/// A single mutex guards both tables, so every compound method is atomic
/// the way one SQL transaction is, including the guarded revoke inside
/// `rotate_session`.
#[derive(Default)]
pub struct InMemoryAuthRepository {
    state: Mutex<StoreState>,
}

impl InMemoryAuthRepository {
    pub fn user_id_by_email(&self, email: &str) -> Option<UserId> {
        let state = self.state.lock().unwrap();
        state
            .users
            .values()
            .find(|u| u.email.as_str() == email && u.deleted_at.is_none())
            .map(|u| u.id)
    }

    pub fn set_user_status(&self, id: &UserId, status: UserStatus) {
        let mut state = self.state.lock().unwrap();
        let user = state.users.get_mut(id).expect("unknown user");
        user.status = status;
    }

    pub fn soft_delete_user(&self, id: &UserId, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        let user = state.users.get_mut(id).expect("unknown user");
        user.deleted_at = Some(at);
    }
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .values()
            .find(|u| u.email.as_str() == email && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .get(id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn create_user(&self, user: User, session: Session) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();

        // Stand-in for the partial unique index on email
        if state
            .users
            .values()
            .any(|u| u.email.as_str() == user.email.as_str() && u.deleted_at.is_none())
        {
            return Err(AuthError::AlreadyExists);
        }

        state.users.insert(user.id, user);
        state.sessions.insert(session.id, session);
        Ok(())
    }

    async fn record_login(
        &self,
        user_id: &UserId,
        logged_in_at: DateTime<Utc>,
        session: Session,
    ) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();

        if let Some(user) = state.users.get_mut(user_id) {
            user.last_login_at = Some(logged_in_at);
        }
        state.sessions.insert(session.id, session);
        Ok(())
    }

    async fn record_session(&self, session: Session) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(session.id, session);
        Ok(())
    }

    async fn find_active_session(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sessions
            .values()
            .find(|s| s.token_digest == digest && s.is_active(now))
            .cloned())
    }

    async fn rotate_session(
        &self,
        consumed: &SessionId,
        revoked_at: DateTime<Utc>,
        replacement: Session,
    ) -> Result<bool, AuthError> {
        let mut state = self.state.lock().unwrap();

        match state.sessions.get_mut(consumed) {
            Some(session) if session.revoked_at.is_none() => {
                session.revoked_at = Some(revoked_at);
            }
            _ => return Ok(false),
        }

        state.sessions.insert(replacement.id, replacement);
        Ok(true)
    }

    async fn revoke_session(&self, id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.sessions.get_mut(id) {
            if session.revoked_at.is_none() {
                session.revoked_at = Some(at);
            }
        }
        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        for session in state.sessions.values_mut() {
            if session.user_id == *user_id && session.revoked_at.is_none() {
                session.revoked_at = Some(at);
            }
        }
        Ok(())
    }
}

/// Engine wired to the in-memory store and a controllable clock.
pub struct TestAuth {
    pub service: AuthService<InMemoryAuthRepository, TestClock>,
    pub repository: Arc<InMemoryAuthRepository>,
    pub clock: TestClock,
}

impl TestAuth {
    pub fn new() -> Self {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "account_service=debug".into()),
            )
            .try_init()
            .ok();

        let repository = Arc::new(InMemoryAuthRepository::default());
        let clock = TestClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let service = AuthService::new(
            Arc::clone(&repository),
            TokenCodec::new(TEST_SECRET),
            clock.clone(),
            Duration::minutes(ACCESS_TTL_MINUTES),
            Duration::days(REFRESH_TTL_DAYS),
        );

        Self {
            service,
            repository,
            clock,
        }
    }
}

pub fn register_command(username: &str, email: &str, password: &str) -> RegisterCommand {
    RegisterCommand::new(
        Username::new(username.to_string()).unwrap(),
        EmailAddress::new(email.to_string()).unwrap(),
        password.to_string(),
    )
}
