//! Axum state and the session cookie extractor.

use crate::auth::manager::SessionManager;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

/// Session token taken from the `session_token` cookie.
///
/// `None` when the request carries no such cookie; the lifecycle manager
/// turns that into `MissingBearer`. A `Cookie` header that isn't visible
/// ASCII, or a token value with characters outside the cookie-octet set,
/// is rejected with 400.
pub struct SessionCookie(pub Option<String>);

impl SessionCookie {
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for SessionCookie
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        for value in parts.headers.get_all(header::COOKIE) {
            let value = value
                .to_str()
                .map_err(|_| AppError::BadRequest("Malformed cookie header".to_string()))?;

            if let Some(token) = find_cookie(value, SESSION_COOKIE)? {
                return Ok(SessionCookie(Some(token)));
            }
        }

        Ok(SessionCookie(None))
    }
}

/// Find cookie `name` in a `Cookie` header value.
///
/// Pairs without `=` are skipped. An optional pair of surrounding double
/// quotes is stripped from the value.
pub fn find_cookie(header: &str, name: &str) -> Result<Option<String>, AppError> {
    for pair in header.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() != name {
            continue;
        }

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        if !value.chars().all(is_cookie_octet) {
            return Err(AppError::BadRequest(format!(
                "Malformed {} cookie",
                SESSION_COOKIE
            )));
        }
        return Ok(Some(value.to_string()));
    }

    Ok(None)
}

/// RFC 6265 `cookie-octet`.
fn is_cookie_octet(c: char) -> bool {
    matches!(c, '!' | '#'..='+' | '-'..=':' | '<'..='[' | ']'..='~')
}
