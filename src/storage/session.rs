//! Session store: the token → session map and its durable mirror.
//!
//! Every mutation goes through one `tokio::sync::Mutex`. Record files are
//! written and deleted while the lock is held, so a compound operation done
//! on a single [`StoreGuard`] (validate-then-purge, create-then-delete) is
//! atomic with respect to every other request.
//!
//! Writes are fail-closed: if the record can't be written, the in-memory
//! entry is not inserted either.

use crate::models::Session;
use crate::storage::record::{self, RecordError};
use crate::storage::user::UserStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session record error: {0}")]
    Record(#[from] RecordError),
}

/// Outcome of recovering sessions from disk at startup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub recovered: usize,
    pub expired: usize,
    pub orphaned: usize,
    pub malformed: usize,
}

pub struct SessionStore {
    dir: PathBuf,
    sessions: Mutex<HashMap<String, Session>>,
}

/// Exclusive access to the store. Dropping it releases the lock.
pub struct StoreGuard<'a> {
    dir: &'a Path,
    sessions: MutexGuard<'a, HashMap<String, Session>>,
}

impl StoreGuard<'_> {
    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.sessions.contains_key(token)
    }

    /// Write the record, then insert. Nothing is inserted if the write fails.
    pub async fn put(&mut self, token: &str, session: Session) -> Result<(), StoreError> {
        record::write_record(self.dir, token, &session).await?;
        self.sessions.insert(token.to_string(), session);
        Ok(())
    }

    /// Delete the record, then the entry. The entry stays if the delete fails.
    ///
    /// Returns false if there was nothing to remove. Tokens that could never
    /// have been stored (bad alphabet) are treated the same way.
    pub async fn remove(&mut self, token: &str) -> Result<bool, StoreError> {
        let deleted = match record::delete_record(self.dir, token).await {
            Ok(deleted) => deleted,
            Err(RecordError::InvalidToken(_)) => false,
            Err(e) => return Err(e.into()),
        };
        let existed = self.sessions.remove(token).is_some();
        Ok(existed || deleted)
    }
}

impl SessionStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    ///
    /// The in-memory map starts empty; call [`load_all`](Self::load_all) or
    /// [`clear_all`](Self::clear_all) before serving requests.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        record::init_dir(&dir).await?;
        Ok(Self {
            dir,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            dir: &self.dir,
            sessions: self.sessions.lock().await,
        }
    }

    pub async fn put(&self, token: &str, session: Session) -> Result<(), StoreError> {
        self.lock().await.put(token, session).await
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.lock().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) -> Result<bool, StoreError> {
        self.lock().await.remove(token).await
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of every entry, expired ones included.
    pub async fn snapshot(&self) -> Vec<(String, Session)> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|(token, session)| (token.clone(), session.clone()))
            .collect()
    }

    /// Recover sessions from the record directory.
    ///
    /// Records that are malformed, expired, or owned by a user that no longer
    /// exists are deleted. A single bad record never aborts recovery.
    pub async fn load_all(&self, users: &UserStore) -> Result<RecoveryReport, StoreError> {
        let mut guard = self.lock().await;
        let mut report = RecoveryReport::default();
        let now = Utc::now();

        for token in record::list_tokens(&self.dir).await? {
            let session = match record::read_record(&self.dir, &token).await {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(RecordError::Malformed(reason)) => {
                    tracing::warn!(reason = %reason, "Discarding malformed session record");
                    report.malformed += 1;
                    discard(&self.dir, &token).await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read session record, skipping");
                    continue;
                }
            };

            if !users.contains(&session.owner) {
                tracing::info!(user = %session.owner, "No user found for stored session, discarding");
                report.orphaned += 1;
                discard(&self.dir, &token).await;
                continue;
            }

            if session.is_expired_at(now) {
                tracing::debug!(user = %session.owner, expiry = %session.expiry, "Stored session timed out");
                report.expired += 1;
                discard(&self.dir, &token).await;
                continue;
            }

            guard.sessions.insert(token, session);
            report.recovered += 1;
        }

        Ok(report)
    }

    /// Delete every record and forget every session.
    ///
    /// Returns the number of record files removed.
    pub async fn clear_all(&self) -> Result<usize, StoreError> {
        let mut guard = self.lock().await;
        let removed = record::delete_all(&self.dir).await?;
        guard.sessions.clear();
        Ok(removed)
    }

    /// Remove every session that has expired by `now`.
    ///
    /// Returns the number of sessions purged.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut guard = self.lock().await;
        let expired: Vec<String> = guard
            .sessions
            .iter()
            .filter(|(_, session)| session.is_expired_at(now))
            .map(|(token, _)| token.clone())
            .collect();

        for token in &expired {
            guard.remove(token).await?;
        }

        Ok(expired.len())
    }
}

async fn discard(dir: &Path, token: &str) {
    if let Err(e) = record::delete_record(dir, token).await {
        tracing::warn!(error = %e, "Failed to delete discarded session record");
    }
}
