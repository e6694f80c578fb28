//! Session API endpoints.

use crate::auth::middleware::{AppState, SessionCookie, SESSION_COOKIE};
use crate::error::AppError;
use crate::models::{IssuedSession, LoginRequest};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use chrono::{DateTime, Utc};

/// Format a timestamp as an HTTP-date (RFC 7231 IMF-fixdate).
fn http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(issued: &IssuedSession) -> String {
    format!(
        "{}={}; Expires={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        issued.token,
        http_date(issued.expiry)
    )
}

/// `Set-Cookie` value that makes the client drop its token.
pub fn cleared_cookie() -> String {
    format!(
        "{}=; Expires={}; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        http_date(DateTime::<Utc>::default())
    )
}

/// Read login fields from a JSON body or an urlencoded form.
///
/// Any body that can't be read is reported the same way as missing fields.
async fn read_login_request(
    state: &AppState,
    request: Request,
) -> Result<LoginRequest, AppError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        Json::<LoginRequest>::from_request(request, state)
            .await
            .map(|Json(req)| req)
            .map_err(|e| AppError::NotAcceptable(e.body_text()))
    } else {
        Form::<LoginRequest>::from_request(request, state)
            .await
            .map(|Form(req)| req)
            .map_err(|e| AppError::NotAcceptable(e.body_text()))
    }
}

/// POST /session/login - Check credentials and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let req = read_login_request(&state, request).await?;

    let (Some(name), Some(password)) = (req.name, req.password) else {
        return Err(AppError::NotAcceptable(
            "name and password are required".to_string(),
        ));
    };

    let issued = state.sessions.login(&name, &password).await?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, session_cookie(&issued))]))
}

/// POST /session/logout - Revoke the session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.logout(cookie.token()).await?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, cleared_cookie())]))
}

/// POST /session/refresh - Swap the session token for a new one
pub async fn refresh(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<impl IntoResponse, AppError> {
    let issued = state.sessions.refresh(cookie.token()).await?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, session_cookie(&issued))]))
}

/// GET /session/status - Owner and expiry of the current session
pub async fn status(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.status(cookie.token()).await?;

    Ok(Json(session))
}

/// GET /session/list - Owner and expiry of every live session
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.list().await;
    tracing::debug!(count = sessions.len(), "Listing sessions");

    Json(sessions)
}
