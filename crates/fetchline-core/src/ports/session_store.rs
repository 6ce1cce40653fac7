//! Download session store port definition.
//!
//! # Persistence Scope
//!
//! **Persisted:** identity, URL, destination, byte offset, total length,
//! state and last error of every session the caller has not removed.
//!
//! **Not persisted:** callbacks and the `Deleted` state.

use async_trait::async_trait;

use super::RepositoryError;
use crate::download::{DownloadSession, SessionId};

/// Port for persisting download sessions.
///
/// Implemented by `fetchline-db` and injected into the download manager.
///
/// # Usage
///
/// ```ignore
/// let store: Arc<dyn DownloadSessionStorePort> = /* ... */;
/// store.save(&session).await?;
/// let stored = store.load(&session.id).await?;
/// ```
#[async_trait]
pub trait DownloadSessionStorePort: Send + Sync {
    /// Load a session by id. Returns `None` when no record exists.
    async fn load(&self, id: &SessionId) -> Result<Option<DownloadSession>, RepositoryError>;

    /// Insert or update a session.
    ///
    /// Updating keeps the record's original position in listings.
    async fn save(&self, session: &DownloadSession) -> Result<(), RepositoryError>;

    /// Delete a session. Returns whether a record existed.
    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError>;

    /// All sessions of `kind`, in insertion order.
    async fn list_all(&self, kind: &str) -> Result<Vec<DownloadSession>, RepositoryError>;

    /// Number of stored sessions across all kinds.
    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Sessions that are not `Completed`, in insertion order.
    async fn list_unfinished(&self) -> Result<Vec<DownloadSession>, RepositoryError>;
}
