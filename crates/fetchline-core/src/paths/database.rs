//! Database path resolution.

use std::path::PathBuf;

use super::error::PathError;
use super::platform::data_root;

/// Get the path to the session database file.
///
/// Returns `fetchline.db` inside the data root.
pub fn database_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("fetchline.db"))
}
