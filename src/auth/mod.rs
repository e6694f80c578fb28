//! Session lifecycle, token generation and the cookie extractor.

pub mod manager;
pub mod middleware;
pub mod session;

pub use manager::SessionManager;
pub use middleware::{AppState, SessionCookie, SESSION_COOKIE};
pub use session::generate_session_token;
