//! Session lifecycle: login, status, refresh and logout.
//!
//! Per token the lifecycle is `absent -> active -> (expired | revoked)`.
//! Refresh never extends a session in place; it revokes the old token and
//! issues a new one, so a token captured before a refresh stops working.
//!
//! Operations that take a token accept `Option<&str>`: `None` means the
//! caller sent no bearer credential at all and yields `MissingBearer`.

use crate::auth::session::generate_session_token;
use crate::error::SessionError;
use crate::models::{IssuedSession, Session};
use crate::storage::{SessionStore, StoreGuard, UserStore};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

pub struct SessionManager {
    users: Arc<UserStore>,
    store: Arc<SessionStore>,
    ttl: TimeDelta,
}

impl SessionManager {
    pub fn new(users: Arc<UserStore>, store: Arc<SessionStore>, ttl: TimeDelta) -> Self {
        Self { users, store, ttl }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, name: &str, password: &str) -> Result<IssuedSession, SessionError> {
        let Some(user) = self.users.authenticate(name, password) else {
            tracing::warn!(action = "login_failed", user = %name, "Invalid credentials");
            return Err(SessionError::InvalidCredentials);
        };

        let mut guard = self.store.lock().await;
        let issued = self.issue(&mut guard, &user.name, Utc::now()).await?;

        tracing::info!(action = "login", user = %user.name, expiry = %issued.expiry, "Session created");
        Ok(issued)
    }

    /// Revoke a session. Unknown tokens count as already logged out.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), SessionError> {
        let token = token.ok_or(SessionError::MissingBearer)?;

        let mut guard = self.store.lock().await;
        let owner = guard.get(token).map(|s| s.owner.clone());
        guard.remove(token).await?;

        match owner {
            Some(owner) => tracing::info!(action = "logout", user = %owner, "Session revoked"),
            None => tracing::debug!(action = "logout", "Logout for unknown session"),
        }
        Ok(())
    }

    /// Replace a live session with a new one for the same owner.
    ///
    /// The new session is persisted before the old one is removed, and both
    /// happen under the same store lock. If the old one can't be removed the
    /// new one is rolled back, leaving the old session as it was.
    pub async fn refresh(&self, token: Option<&str>) -> Result<IssuedSession, SessionError> {
        let token = token.ok_or(SessionError::MissingBearer)?;

        let mut guard = self.store.lock().await;
        let now = Utc::now();
        let owner = live_session(&mut guard, token, now).await?.owner;

        let issued = self.issue(&mut guard, &owner, now).await?;
        if let Err(e) = guard.remove(token).await {
            if let Err(rollback) = guard.remove(&issued.token).await {
                tracing::error!(error = %rollback, user = %owner, "Failed to roll back refreshed session");
            }
            return Err(e.into());
        }

        tracing::info!(action = "refresh", user = %owner, expiry = %issued.expiry, "Session refreshed");
        Ok(issued)
    }

    /// Return the session behind `token` if it is live.
    pub async fn status(&self, token: Option<&str>) -> Result<Session, SessionError> {
        let token = token.ok_or(SessionError::MissingBearer)?;
        let mut guard = self.store.lock().await;
        live_session(&mut guard, token, Utc::now()).await
    }

    /// Return the owner of `token` if it is live.
    pub async fn validate(&self, token: Option<&str>) -> Result<String, SessionError> {
        self.status(token).await.map(|session| session.owner)
    }

    /// Live sessions ordered by expiry. Tokens are not included.
    pub async fn list(&self) -> Vec<Session> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .store
            .snapshot()
            .await
            .into_iter()
            .map(|(_, session)| session)
            .filter(|session| !session.is_expired_at(now))
            .collect();
        sessions.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.owner.cmp(&b.owner)));
        sessions
    }

    async fn issue(
        &self,
        guard: &mut StoreGuard<'_>,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let token = loop {
            let candidate = generate_session_token();
            if !guard.contains(&candidate) {
                break candidate;
            }
        };

        let session = Session::starting_at(owner, now, self.ttl);
        let expiry = session.expiry;
        guard.put(&token, session).await?;

        Ok(IssuedSession { token, expiry })
    }
}

/// Present-and-unexpired check. An expired session is purged on sight.
async fn live_session(
    guard: &mut StoreGuard<'_>,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Session, SessionError> {
    let session = guard.get(token).cloned().ok_or(SessionError::Unauthorized)?;

    if session.is_expired_at(now) {
        guard.remove(token).await?;
        tracing::info!(action = "expired", user = %session.owner, "Session expired");
        return Err(SessionError::Unauthorized);
    }

    Ok(session)
}
