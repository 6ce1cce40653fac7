//! `SQLite` persistence for fetchline download sessions.
//!
//! The pool never leaves this crate: callers get a
//! [`DownloadSessionStorePort`](fetchline_core::DownloadSessionStorePort)
//! trait object from [`StoreFactory`].

pub mod factory;
pub mod repositories;
pub mod setup;

pub use factory::StoreFactory;

// Re-export TestDb for tests in downstream crates
#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestDb;

pub use repositories::SqliteDownloadSessionStore;

pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
