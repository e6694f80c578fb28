//! Storage layer for credentials and sessions.
//!
//! - `user` - read-only credential store loaded from JSON
//! - `session` - in-memory session map with a write-through file mirror
//! - `record` - the flat-text on-disk format of one session

pub mod record;
pub mod session;
pub mod user;

pub use session::{RecoveryReport, SessionStore, StoreError, StoreGuard};
pub use user::{UserStore, UserStoreError};
