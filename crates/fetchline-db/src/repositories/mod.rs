//! Store implementations using `SQLite`.
//!
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod sqlite_download_session_store;

pub use sqlite_download_session_store::SqliteDownloadSessionStore;
