//! Session lookup for the auth boundary
//!
//! Sessions are opaque random tokens with an expiry. Resolving an expired
//! token behaves exactly like resolving an unknown one.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::db::DatabaseService;
use crate::models::Session;
use crate::services::ServiceError;

/// Default session lifetime
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

pub struct SessionService {
    db: Arc<DatabaseService>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self::with_ttl(db, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_ttl(db: Arc<DatabaseService>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Start a session for `user_id`
    pub async fn create_session(&self, user_id: &str) -> Result<Session, ServiceError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ServiceError::invalid_input("user id is required"));
        }

        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            expires_at: Utc::now() + self.ttl,
        };
        self.db.db_create_session(&session).await?;
        Ok(session)
    }

    /// The live session for `token`, if any
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, ServiceError> {
        let Some(session) = self.db.db_find_session(token).await? else {
            return Ok(None);
        };

        if session.expires_at <= Utc::now() {
            debug!(user_id = %session.user_id, "session expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub async fn end_session(&self, token: &str) -> Result<bool, ServiceError> {
        Ok(self.db.db_delete_session(token).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> anyhow::Result<(Arc<DatabaseService>, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db = Arc::new(DatabaseService::new(temp_dir.path().join("sessions.db")).await?);
        Ok((db, temp_dir))
    }

    #[tokio::test]
    async fn test_session_round_trip_and_end() -> anyhow::Result<()> {
        let (db, _temp_dir) = create_test_db().await?;
        let sessions = SessionService::new(db);

        let session = sessions.create_session("u1").await?;
        let resolved = sessions.resolve(&session.token).await?.unwrap();
        assert_eq!(resolved.user_id, "u1");

        assert!(sessions.end_session(&session.token).await?);
        assert!(sessions.resolve(&session.token).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_session_does_not_resolve() -> anyhow::Result<()> {
        let (db, _temp_dir) = create_test_db().await?;
        let sessions = SessionService::with_ttl(db, Duration::seconds(-5));

        let session = sessions.create_session("u1").await?;
        assert!(sessions.resolve(&session.token).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token() -> anyhow::Result<()> {
        let (db, _temp_dir) = create_test_db().await?;
        let sessions = SessionService::new(db);
        assert!(sessions.resolve("nope").await?.is_none());
        Ok(())
    }
}
