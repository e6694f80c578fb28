//! sessiond application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Load the credential file
//! 3. Recover durable sessions (or wipe them with `--clean`)
//! 4. Start the cleanup job
//! 5. Build router and start Axum server

use chrono::Utc;
use sessiond::{
    auth::{AppState, SessionManager},
    cleanup,
    config::Config,
    middleware::security_headers,
    routes,
    storage::{SessionStore, UserStore},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

fn print_usage() {
    eprintln!("Usage: sessiond [--clean]");
    eprintln!();
    eprintln!("  --clean    discard stored sessions instead of recovering them");
    eprintln!();
    eprintln!("Configuration is read from the environment (or .env):");
    eprintln!("  HOST, PORT, USERS_FILE, SESSION_TTL_MINS, SESSION_DIR,");
    eprintln!("  CLEAN_SESSIONS, CLEANUP_INTERVAL_SECS");
}

#[tokio::main]
async fn main() {
    let mut clean = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--clean" => clean = true,
            "-h" | "--help" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = Config::from_env().expect("Failed to load config");
    config.clean_sessions |= clean;

    let users = UserStore::load(&config.users_file)
        .await
        .expect("Failed to load user file");
    tracing::info!(count = users.len(), file = %config.users_file.display(), "Users loaded");
    for name in users.names() {
        tracing::debug!(user = %name, "Known user");
    }

    let store = SessionStore::open(&config.session_dir)
        .await
        .expect("Failed to open session directory");

    if config.clean_sessions {
        let removed = store
            .clear_all()
            .await
            .expect("Failed to clear stored sessions");
        tracing::info!(removed, "Stored sessions cleared");
    } else {
        let report = store
            .load_all(&users)
            .await
            .expect("Failed to recover stored sessions");
        tracing::info!(
            recovered = report.recovered,
            expired = report.expired,
            orphaned = report.orphaned,
            malformed = report.malformed,
            "Sessions loaded"
        );
        for (_, session) in store.snapshot().await {
            tracing::debug!(user = %session.owner, expires_in = %(session.expiry - Utc::now()), "Recovered session");
        }
    }

    let store = Arc::new(store);

    if let Some(interval) = config.cleanup_interval() {
        tokio::spawn(cleanup::run_cleanup_loop(store.clone(), interval));
    }

    let sessions = SessionManager::new(Arc::new(users), store, config.session_ttl());

    let state = AppState {
        sessions: Arc::new(sessions),
    };

    // No cross-origin callers; CorsLayer::new() with no allowed origins
    // rejects every preflight.
    let app = routes::api_router()
        .layer(CorsLayer::new())
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .expect("Failed to bind");
    tracing::info!(
        "Listening on {}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.bind_addr())
    );

    axum::serve(listener, app).await.expect("Server error");
}
