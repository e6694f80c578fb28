//! API route handlers.

pub mod session;

use crate::auth::middleware::AppState;
use axum::{routing::get, routing::post, Router};

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/session/login", post(session::login))
        .route("/session/logout", post(session::logout))
        .route("/session/refresh", post(session::refresh))
        .route("/session/status", get(session::status))
        .route("/session/list", get(session::list))
}
