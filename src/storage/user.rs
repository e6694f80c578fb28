//! Credential store loaded once from a JSON file.
//!
//! File format: a JSON array of `{"name", "password", "admin"}` objects.
//! The store is read-only after load and small enough for linear scans.

use crate::models::User;
use std::collections::HashSet;
use std::path::Path;

/// Error type for loading the credential file.
#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("Failed to read user file {0}: {1}")]
    Io(String, std::io::Error),

    #[error("Failed to parse user file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate user name: {0}")]
    Duplicate(String),
}

#[derive(Debug, Default)]
pub struct UserStore {
    users: Vec<User>,
}

impl UserStore {
    /// Build a store from an in-memory list, rejecting duplicate names.
    pub fn new(users: Vec<User>) -> Result<Self, UserStoreError> {
        let mut seen = HashSet::new();
        for user in &users {
            if !seen.insert(user.name.as_str()) {
                return Err(UserStoreError::Duplicate(user.name.clone()));
            }
        }
        Ok(Self { users })
    }

    pub fn from_json(json: &str) -> Result<Self, UserStoreError> {
        let users: Vec<User> = serde_json::from_str(json)?;
        Self::new(users)
    }

    pub async fn load(path: &Path) -> Result<Self, UserStoreError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UserStoreError::Io(path.display().to_string(), e))?;
        Self::from_json(&json)
    }

    /// Find the user whose name and password both match exactly.
    pub fn authenticate(&self, name: &str, password: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.name == name && u.password == password)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.users.iter().any(|u| u.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(|u| u.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
