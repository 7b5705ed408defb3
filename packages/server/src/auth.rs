//! Session extraction
//!
//! A session token arrives either as `Authorization: Bearer <token>` or as
//! the `mindgrid-session` cookie. The bearer header wins when both are set.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use mindgrid_core::Session;

use crate::{AppState, HttpError};

pub const SESSION_COOKIE: &str = "mindgrid-session";

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Raw session token carried by the request, if any
pub fn session_token(parts: &Parts) -> Option<String> {
    bearer_token(parts)
        .or_else(|| cookie_token(parts))
        .map(str::to_string)
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<Session>, HttpError> {
    let Some(token) = session_token(parts) else {
        return Ok(None);
    };
    Ok(state.sessions.resolve(&token).await?)
}

/// The authenticated caller. Rejects with 401 when there is no live session.
pub struct CurrentUser(pub Session);

impl CurrentUser {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(HttpError::unauthorized)
    }
}

/// The caller's session, if there is one. Never rejects for a missing session.
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_cookie() {
        let parts = parts(&[("cookie", "theme=dark; mindgrid-session=abc123; other=1")]);
        assert_eq!(session_token(&parts).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let parts = parts(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "mindgrid-session=from-cookie"),
        ]);
        assert_eq!(session_token(&parts).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_no_token() {
        assert_eq!(session_token(&parts(&[])), None);
        assert_eq!(session_token(&parts(&[("authorization", "Basic xyz")])), None);
        assert_eq!(session_token(&parts(&[("cookie", "mindgrid-session=")])), None);
    }
}
