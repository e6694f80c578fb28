use chrono::TimeDelta;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on `SESSION_TTL_MINS` (ten years).
pub const MAX_SESSION_TTL_MINS: u64 = 5_256_000;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Credentials
    pub users_file: PathBuf,

    // Sessions
    pub session_ttl_mins: u64,
    pub session_dir: PathBuf,
    pub clean_sessions: bool,

    // Janitor (0 disables it)
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        let _ = dotenvy::dotenv();

        let host = env::var("HOST").unwrap_or_else(|_| "localhost".to_string());
        if host.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "HOST".to_string(),
                "cannot be empty".to_string(),
            ));
        }
        let port = parse_env_or_default("PORT", 16000u16)?;

        let users_file = PathBuf::from(
            env::var("USERS_FILE").unwrap_or_else(|_| "users.json".to_string()),
        );

        let session_ttl_mins = parse_env_or_default("SESSION_TTL_MINS", 60u64)?;
        if session_ttl_mins == 0 || session_ttl_mins > MAX_SESSION_TTL_MINS {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_MINS".to_string(),
                format!("must be between 1 and {}", MAX_SESSION_TTL_MINS),
            ));
        }

        let session_dir = PathBuf::from(
            env::var("SESSION_DIR").unwrap_or_else(|_| "/tmp/user-session".to_string()),
        );
        let clean_sessions = parse_env_or_default("CLEAN_SESSIONS", false)?;

        let cleanup_interval_secs = parse_env_or_default("CLEANUP_INTERVAL_SECS", 60u64)?;

        Ok(Config {
            host,
            port,
            users_file,
            session_ttl_mins,
            session_dir,
            clean_sessions,
            cleanup_interval_secs,
        })
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> TimeDelta {
        TimeDelta::minutes(self.session_ttl_mins as i64)
    }

    /// Janitor period, or None when disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
