//! Application state and initialization
//!
//! Opens the local database, loads the persisted reading state and binds a
//! text client to the saved translation. Everything the commands need is
//! reachable from [`AppState`].

use crate::config::{ApiConfig, DATABASE_FILE};
use crate::database::create_pool;
use crate::error::Result;
use crate::services::ReaderSession;
use crate::storage::{LocalStorage, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: ApiConfig,
    pub session: ReaderSession,
}

/// Application setup - called once on startup
pub async fn setup(data_dir: PathBuf, config: ApiConfig) -> Result<AppState> {
    tracing::info!("Initializing reader");
    tracing::info!("Data directory: {:?}", data_dir);
    tracing::info!("Text API: {}", config.base_url);

    std::fs::create_dir_all(&data_dir)?;

    let pool = create_pool(&data_dir.join(DATABASE_FILE)).await?;
    let storage = LocalStorage::new(Arc::new(SqliteStore::new(pool)));
    let session = ReaderSession::open(&config, storage).await?;

    tracing::info!("Reader initialized successfully");

    Ok(AppState {
        data_dir,
        config,
        session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_setup_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested");

        let state = setup(data_dir.clone(), ApiConfig::default()).await.unwrap();

        assert!(data_dir.join(DATABASE_FILE).exists());
        assert_eq!(state.session.store().preferences().translation, "AKJV");
    }
}
