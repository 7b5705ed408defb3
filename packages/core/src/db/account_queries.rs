//! Profile, settings and session SQL

use chrono::{DateTime, Utc};

use crate::db::{DatabaseError, DatabaseService};
use crate::models::{Profile, Session};

impl DatabaseService {
    //
    // PROFILES
    //

    pub async fn db_get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                "SELECT user_id, organization_id FROM profiles WHERE user_id = ?",
                [user_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("get profile", e))?;

        match rows.next().await? {
            Some(row) => Ok(Some(Profile {
                user_id: row.get(0)?,
                organization_id: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    pub async fn db_upsert_profile(&self, profile: &Profile) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO profiles (user_id, organization_id) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET organization_id = excluded.organization_id",
            (profile.user_id.as_str(), profile.organization_id.as_deref()),
        )
        .await
        .map_err(|e| DatabaseError::from_query("upsert profile", e))?;

        Ok(())
    }

    //
    // USER SETTINGS
    //

    /// Stored provider API key for `user_id`
    ///
    /// `Ok(None)` covers both "no settings row" and "row with NULL key".
    /// A missing `user_settings` table or `openai_api_key` column surfaces as
    /// [`DatabaseError::MissingSchema`].
    pub async fn db_get_api_key(&self, user_id: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                "SELECT openai_api_key FROM user_settings WHERE user_id = ?",
                [user_id],
            )
            .await
            .map_err(|e| DatabaseError::from_query("read user_settings.openai_api_key", e))?;

        match rows.next().await? {
            Some(row) => {
                let key: Option<String> = row.get(0)?;
                Ok(key)
            }
            None => Ok(None),
        }
    }

    pub async fn db_set_api_key(
        &self,
        user_id: &str,
        api_key: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO user_settings (user_id, openai_api_key, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                openai_api_key = excluded.openai_api_key,
                updated_at = excluded.updated_at",
            (user_id, api_key, Utc::now().to_rfc3339()),
        )
        .await
        .map_err(|e| DatabaseError::from_query("write user_settings.openai_api_key", e))?;

        Ok(())
    }

    //
    // SESSIONS
    //

    pub async fn db_create_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)",
            (
                session.token.as_str(),
                session.user_id.as_str(),
                session.expires_at.timestamp(),
            ),
        )
        .await
        .map_err(|e| DatabaseError::from_query("insert session", e))?;

        Ok(())
    }

    /// Look up a session by token, expired or not
    pub async fn db_find_session(&self, token: &str) -> Result<Option<Session>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                "SELECT token, user_id, expires_at FROM sessions WHERE token = ?",
                [token],
            )
            .await
            .map_err(|e| DatabaseError::from_query("get session", e))?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let expires_at: i64 = row.get(2)?;
        let expires_at = DateTime::<Utc>::from_timestamp(expires_at, 0).ok_or_else(|| {
            DatabaseError::invalid_row(
                "sessions",
                format!("expires_at out of range: {}", expires_at),
            )
        })?;

        Ok(Some(Session {
            token: row.get(0)?,
            user_id: row.get(1)?,
            expires_at,
        }))
    }

    pub async fn db_delete_session(&self, token: &str) -> Result<bool, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let deleted = conn
            .execute("DELETE FROM sessions WHERE token = ?", [token])
            .await
            .map_err(|e| DatabaseError::from_query("delete session", e))?;

        Ok(deleted > 0)
    }
}
