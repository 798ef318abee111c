//! linkshare-web: server for the dashboard, public pages and JSON API.
//!
//! Renders pages with embedded templates, persists state in SQLite and
//! keeps uploaded images in a filesystem blob store.

pub mod config;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;
pub mod static_files;
pub mod templates;
pub mod utils;

use std::sync::Arc;

use clap::Parser;

use crate::storage::{blob_root, db_path};

use config::{Cli, Config};
use state::{AppState, SharedState};
use utils::now_secs;

/// Entry point: parse CLI, open storage, start server.
pub async fn run() {
    let cli = Cli::parse();
    let config = Config::from_cli_and_env(cli);

    crate::logging::init();

    crate::tlog!("linkshare-web starting");
    crate::tlog!("  data directory: {}", config.data_dir.display());

    let state = AppState::open(&config).expect("failed to open data directory");
    crate::tlog!("  database: {}", db_path(&config.data_dir).display());
    crate::tlog!("  blobs: {}", blob_root(&config.data_dir).display());
    crate::tlog!("  public url: {}", config.public_url);

    match state.storage.delete_expired_sessions(now_secs()) {
        Ok(0) => {}
        Ok(n) => crate::tlog!("  purged {} expired sessions", n),
        Err(e) => crate::tlog!("  WARNING: failed to purge expired sessions: {}", e),
    }
    crate::tlog!(
        "  profiles: {}, links: {}",
        state.storage.count_profiles().unwrap_or(0),
        state.storage.count_all_links().unwrap_or(0)
    );

    let state: SharedState = Arc::new(tokio::sync::Mutex::new(state));
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    crate::tlog!("linkshare-web listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
