//! Shared application state.

use std::sync::Arc;

use tera::Tera;
use tokio::sync::Mutex;

use crate::blobs::BlobStore;
use crate::services::SqliteBackend;
use crate::storage::{blob_root, db_path, Storage, StorageError};
use crate::web::config::Config;
use crate::web::templates;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

pub struct AppState {
    pub storage: Storage,
    pub blobs: BlobStore,
    pub templates: Tera,
    pub public_url: String,
    pub session_ttl_secs: u64,
}

impl AppState {
    /// Open the database and blob store under the configured data directory
    /// and load the embedded templates.
    pub fn open(config: &Config) -> Result<Self, StartupError> {
        let storage = Storage::open(&db_path(&config.data_dir))?;
        let blobs = BlobStore::open(&blob_root(&config.data_dir), config.public_url.clone())?;
        Ok(Self {
            storage,
            blobs,
            templates: templates::load()?,
            public_url: config.public_url.clone(),
            session_ttl_secs: config.session_ttl_secs,
        })
    }

    /// Services bound to this state for one request.
    pub fn backend(&self, now_millis: u64) -> SqliteBackend<'_> {
        SqliteBackend::new(&self.storage, &self.blobs, now_millis)
    }
}

pub type SharedState = Arc<Mutex<AppState>>;
