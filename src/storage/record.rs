//! Durable session records on the filesystem.
//!
//! File structure:
//! - `{session_dir}/{token}` - `"<owner> <expiry>"`, expiry in RFC 3339 UTC
//!
//! This is the only module that knows the on-disk format. Swapping it for a
//! structured encoding does not touch the session store or the manager.

use crate::models::Session;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Longest token accepted as a file name.
const MAX_TOKEN_LEN: usize = 128;

/// Error type for record file operations.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Whether `token` is safe to use as a record file name.
///
/// Only the URL-safe base64 alphabet is allowed, which rules out path
/// separators, `..` and the `.tmp` suffix of in-flight writes.
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn record_path(dir: &Path, token: &str) -> Result<PathBuf, RecordError> {
    if !is_valid_token(token) {
        return Err(RecordError::InvalidToken(
            "token contains characters outside the URL-safe alphabet".to_string(),
        ));
    }
    Ok(dir.join(token))
}

/// Encode a session as a single line `"<owner> <expiry>"`.
pub fn encode(session: &Session) -> String {
    format!(
        "{} {}",
        session.owner,
        session.expiry.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

/// Decode a record written by [`encode`].
///
/// The timestamp never contains a space, so the owner is everything before
/// the last one.
pub fn decode(contents: &str) -> Result<Session, RecordError> {
    let line = contents.trim_end_matches(['\n', '\r']);
    let (owner, expiry) = line
        .rsplit_once(' ')
        .ok_or_else(|| RecordError::Malformed("expected \"<owner> <expiry>\"".to_string()))?;

    if owner.is_empty() {
        return Err(RecordError::Malformed("empty owner".to_string()));
    }

    let expiry = DateTime::parse_from_rfc3339(expiry)
        .map_err(|e| RecordError::Malformed(format!("bad expiry {:?}: {}", expiry, e)))?
        .with_timezone(&Utc);

    Ok(Session {
        owner: owner.to_string(),
        expiry,
    })
}

/// Create the record directory if it doesn't exist.
pub async fn init_dir(dir: &Path) -> Result<(), RecordError> {
    fs::create_dir_all(dir).await?;
    Ok(())
}

/// Write (or overwrite) the record for `token`.
///
/// Writes to a temp file and renames it into place so a crash never leaves a
/// half-written record behind.
pub async fn write_record(dir: &Path, token: &str, session: &Session) -> Result<(), RecordError> {
    let path = record_path(dir, token)?;

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(encode(session).as_bytes()).await?;
    file.sync_all().await?;

    fs::rename(&temp_path, &path).await?;

    Ok(())
}

/// Read and decode the record for `token`.
///
/// Returns None if the record doesn't exist.
pub async fn read_record(dir: &Path, token: &str) -> Result<Option<Session>, RecordError> {
    let path = record_path(dir, token)?;

    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RecordError::Io(e)),
    };
    let contents = String::from_utf8(bytes)
        .map_err(|e| RecordError::Malformed(format!("not UTF-8: {}", e)))?;

    decode(&contents).map(Some)
}

/// Delete the record for `token`.
///
/// Returns true if the record was deleted, false if it didn't exist.
pub async fn delete_record(dir: &Path, token: &str) -> Result<bool, RecordError> {
    let path = record_path(dir, token)?;

    match fs::remove_file(&path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(RecordError::Io(e)),
    }
}

/// List every file name in the record directory whose name is a valid token.
///
/// Temp files and foreign names are skipped.
pub async fn list_tokens(dir: &Path) -> Result<Vec<String>, RecordError> {
    let mut tokens = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if is_valid_token(name) => tokens.push(name.to_string()),
            Some(name) => tracing::debug!(file = %name, "Skipping non-record file"),
            None => continue,
        }
    }

    Ok(tokens)
}

/// Delete every regular file in the record directory, temp files included.
///
/// Returns the number of files removed.
pub async fn delete_all(dir: &Path) -> Result<usize, RecordError> {
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RecordError::Io(e)),
        }
    }

    Ok(removed)
}
