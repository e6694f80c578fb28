//! Request, response and domain models.
//!
//! All models use serde for serialization/deserialization.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Credential Models
// ============================================================================

/// A known user, as listed in the credential file.
#[derive(Clone, Deserialize)]
pub struct User {
    pub name: String,
    pub password: String,
    /// Informational only; nothing is gated on it.
    #[serde(default)]
    pub admin: bool,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .field("admin", &self.admin)
            .finish()
    }
}

// ============================================================================
// Session Models
// ============================================================================

/// One authenticated login.
///
/// Serialized as `{"user": ..., "expiry": ...}` for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(rename = "user")]
    pub owner: String,
    pub expiry: DateTime<Utc>,
}

impl Session {
    /// Session for `owner` created at `now`, expiring exactly `ttl` later.
    pub fn starting_at(owner: impl Into<String>, now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            owner: owner.into(),
            expiry: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

/// Token handed to a client after login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

// ============================================================================
// Request Models
// ============================================================================

/// Login form or JSON body. Both fields are optional so that a missing one
/// can be reported as 406 rather than a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub name: Option<String>,
    pub password: Option<String>,
}
