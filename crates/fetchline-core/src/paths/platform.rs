//! Platform-specific data root resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::PathError;

/// Environment variable overriding the data root.
pub(super) const DATA_DIR_ENV: &str = "FETCHLINE_DATA_DIR";

/// Create `path` if missing and make sure it is a directory.
pub(super) fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Get the root directory for application data (database, config).
///
/// Resolution order:
/// 1. `FETCHLINE_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/fetchline`)
///
/// The directory is created if it does not exist.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var(DATA_DIR_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join("fetchline"),
    };

    ensure_dir(&root)?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::test_utils::{ENV_LOCK, EnvVarGuard};

    #[test]
    fn test_env_override_is_created() {
        let _lock = ENV_LOCK.lock().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("nested").join("data");
        let _env = EnvVarGuard::set(DATA_DIR_ENV, target.to_str().unwrap());

        let root = data_root().unwrap();

        assert_eq!(root, target);
        assert!(root.is_dir());
    }

    #[test]
    fn test_file_in_the_way_is_rejected() {
        let _lock = ENV_LOCK.lock().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let _env = EnvVarGuard::set(DATA_DIR_ENV, file.to_str().unwrap());

        assert!(matches!(data_root(), Err(PathError::NotADirectory(_))));
    }
}
