use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Session;
use crate::domain::user::models::SessionId;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::AuthRepository;
use crate::user::errors::AuthError;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, status, last_login_at, created_at, deleted_at";
const SESSION_COLUMNS: &str = "id, user_id, token_digest, expires_at, revoked_at, created_at";

pub struct PostgresAuthRepository {
    pool: PgPool,
}

impl PostgresAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_session<'e, E>(executor: E, session: &Session) -> Result<(), AuthError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (id, user_id, token_digest, expires_at, revoked_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.id.0)
        .bind(session.user_id.0)
        .bind(&session.token_digest)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .bind(session.created_at)
        .execute(executor)
        .await
        .map_err(database_error)?;

        Ok(())
    }
}

#[async_trait]
impl AuthRepository for PostgresAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn create_user(&self, user: User, session: Session) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, status, last_login_at, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AuthError::AlreadyExists;
                }
            }
            AuthError::Database(e.to_string())
        })?;

        Self::insert_session(&mut *tx, &session).await?;

        tx.commit().await.map_err(database_error)?;

        Ok(())
    }

    async fn record_login(
        &self,
        user_id: &UserId,
        logged_in_at: DateTime<Utc>,
        session: Session,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id.0)
            .bind(logged_in_at)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        Self::insert_session(&mut *tx, &session).await?;

        tx.commit().await.map_err(database_error)?;

        Ok(())
    }

    async fn record_session(&self, session: Session) -> Result<(), AuthError> {
        Self::insert_session(&self.pool, &session).await
    }

    async fn find_active_session(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM refresh_sessions
            WHERE token_digest = $1 AND revoked_at IS NULL AND expires_at > $2
            "#
        ))
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn rotate_session(
        &self,
        consumed: &SessionId,
        revoked_at: DateTime<Utc>,
        replacement: Session,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // Guarded revoke: zero rows hit means another caller consumed the
        // session first, in which case nothing may be written.
        let revoked =
            sqlx::query("UPDATE refresh_sessions SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL")
                .bind(consumed.0)
                .bind(revoked_at)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await.map_err(database_error)?;
            return Ok(false);
        }

        Self::insert_session(&mut *tx, &replacement).await?;

        tx.commit().await.map_err(database_error)?;

        Ok(true)
    }

    async fn revoke_session(&self, id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_sessions SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL")
            .bind(id.0)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE refresh_sessions SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }
}

fn database_error(e: sqlx::Error) -> AuthError {
    AuthError::Database(e.to_string())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> Result<User, AuthError> {
        Ok(User {
            id: UserId(self.id),
            username: Username::new(self.username)?,
            email: EmailAddress::new(self.email)?,
            password_hash: self.password_hash,
            status: self.status.parse()?,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    token_digest: String,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: SessionId(self.id),
            user_id: UserId(self.user_id),
            token_digest: self.token_digest,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        }
    }
}
