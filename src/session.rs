//! Client sessions for the admin gate.
//!
//! A session is keyed by a random id carried in a signed cookie and
//! persisted server-side. The gate stores two things in it: the
//! authenticated principal and the path an unauthenticated client was
//! originally headed to.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::Row;
use thiserror::Error;

use crate::db::DbPool;
use crate::sql;

/// Opaque authenticated identity stored in a session.
///
/// Produced by the authenticate callback; the gate only tests presence.
pub type Principal = serde_json::Value;

/// Errors from session storage.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("corrupt principal in session record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("invalid timestamp in session record: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// One client session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub principal: Option<Principal>,
    pub redirect_to: Option<String>,
}

impl Session {
    /// Create a fresh unauthenticated session with a random id.
    pub fn new() -> Self {
        Self {
            id: generate_session_id(),
            principal: None,
            redirect_to: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a cryptographically secure session ID.
fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Per-request session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load a session by id. Expired or unknown ids yield `None`.
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionError>;

    /// Persist the session, refreshing its expiry.
    async fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Drop the session. Unknown ids are not an error.
    async fn destroy(&self, id: &str) -> Result<(), SessionError>;
}

/// Database-backed session storage with a TTL expiry policy.
pub struct SqliteSessionStore {
    pool: DbPool,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Delete all expired sessions (background cleanup task).
    pub async fn cleanup_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query(sql::DELETE_EXPIRED_SESSIONS)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query(sql::SELECT_SESSION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.get("expires_at");
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)?.with_timezone(&Utc);
        if expires_at < Utc::now() {
            // Lazy expiry: drop the stale row on first sight.
            self.destroy(id).await.ok();
            return Ok(None);
        }

        let principal: Option<String> = row.get("principal");
        let principal = principal
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Some(Session {
            id: row.get("id"),
            principal,
            redirect_to: row.get("redirect_to"),
        }))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let principal = session
            .principal
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now();
        let expires_at = now + self.ttl;

        sqlx::query(sql::UPSERT_SESSION)
            .bind(&session.id)
            .bind(&principal)
            .bind(&session.redirect_to)
            .bind(now.to_rfc3339())
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        sqlx::query(sql::DELETE_SESSION)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
