//! Default download directory resolution.

use std::env;
use std::path::PathBuf;

use super::error::PathError;
use super::platform::{data_root, ensure_dir};

/// Environment variable overriding the download directory.
const DOWNLOAD_DIR_ENV: &str = "FETCHLINE_DOWNLOAD_DIR";

/// Directory new downloads are written to when the caller gives no path.
///
/// Resolution order:
/// 1. `FETCHLINE_DOWNLOAD_DIR` environment variable
/// 2. The user's download directory (e.g., `~/Downloads`)
/// 3. `downloads/` under the data root
pub fn default_download_dir() -> Result<PathBuf, PathError> {
    let dir = match env::var(DOWNLOAD_DIR_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => match dirs::download_dir() {
            Some(dir) => dir,
            None => data_root()?.join("downloads"),
        },
    };

    ensure_dir(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::test_utils::{ENV_LOCK, EnvVarGuard};

    #[test]
    fn test_env_override() {
        let _lock = ENV_LOCK.lock().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("dl");
        let _env = EnvVarGuard::set(DOWNLOAD_DIR_ENV, target.to_str().unwrap());

        assert_eq!(default_download_dir().unwrap(), target);
        assert!(target.is_dir());
    }
}
