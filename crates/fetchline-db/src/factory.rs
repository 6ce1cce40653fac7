//! Composition utilities for `SQLite`-backed stores.
//!
//! Construction only; no domain logic lives here.

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use fetchline_core::DownloadSessionStorePort;

use crate::repositories::SqliteDownloadSessionStore;
use crate::setup::setup_database;

/// Factory for creating store instances with `SQLite` backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Open the database at `db_path` and apply the schema.
    pub async fn create_pool(db_path: &Path) -> anyhow::Result<SqlitePool> {
        setup_database(db_path).await
    }

    /// Build the session store as a port trait object.
    pub fn session_store(pool: SqlitePool) -> Arc<dyn DownloadSessionStorePort> {
        Arc::new(SqliteDownloadSessionStore::new(pool))
    }

    /// Open the database at `db_path` and build the session store in one step.
    pub async fn open_session_store(
        db_path: &Path,
    ) -> anyhow::Result<Arc<dyn DownloadSessionStorePort>> {
        let pool = Self::create_pool(db_path).await?;
        Ok(Self::session_store(pool))
    }
}

/// Test database helper.
///
/// Provides an in-memory `SQLite` database with the production schema applied.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn session_store(&self) -> Arc<SqliteDownloadSessionStore> {
        Arc::new(SqliteDownloadSessionStore::new(self.pool.clone()))
    }
}
