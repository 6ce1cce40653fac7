//! Path utilities for fetchline data directories.
//!
//! This module provides the canonical path resolution for:
//! - Application data root
//! - Session database location
//! - Default download directory
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately

mod database;
mod downloads;
mod error;
mod platform;

#[cfg(test)]
mod test_utils;

pub use database::database_path;
pub use downloads::default_download_dir;
pub use error::PathError;
pub use platform::data_root;
