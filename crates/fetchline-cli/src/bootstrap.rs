//! CLI bootstrap - the composition root.
//!
//! The only place where infrastructure is wired together:
//! - Session store (via fetchline-db)
//! - HTTP transport and JSON client (via fetchline-http)
//! - Download manager (via fetchline-download)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use fetchline_core::paths::{database_path, default_download_dir};
use fetchline_core::{
    DownloadManagerConfig, DownloadSessionStorePort, HttpTransportPort, RequestRegistry,
};
use fetchline_db::StoreFactory;
use fetchline_download::{DownloadManagerDeps, DownloadManagerImpl};
use fetchline_http::{HttpClient, HttpConfig, ReqwestTransport};

const DATABASE_FILE: &str = "fetchline.db";

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Overrides the data root holding the session database.
    pub data_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    /// Timeout for `get` requests. Download transfers are never timed out.
    pub request_timeout: Option<Duration>,
    pub download: DownloadManagerConfig,
}

impl CliConfig {
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(match &self.data_dir {
            Some(dir) => dir.join(DATABASE_FILE),
            None => database_path()?,
        })
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub http: HttpClient,
    pub downloads: Arc<DownloadManagerImpl>,
    pub store: Arc<dyn DownloadSessionStorePort>,
    pub download_dir: PathBuf,
    config: CliConfig,
    transfer_transport: Arc<dyn HttpTransportPort>,
}

impl CliContext {
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn downloads(&self) -> &Arc<DownloadManagerImpl> {
        &self.downloads
    }

    /// A manager sharing this context's store and transport but using
    /// `config` (for one-off policies such as `--restart`).
    pub fn downloads_with(&self, config: DownloadManagerConfig) -> DownloadManagerImpl {
        DownloadManagerImpl::new(
            DownloadManagerDeps {
                store: Arc::clone(&self.store),
                transport: Arc::clone(&self.transfer_transport),
            },
            config,
        )
    }

    pub fn config(&self) -> &CliConfig {
        &self.config
    }
}

/// Bootstrap the CLI application.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let db_path = config.database_path()?;
    debug!(path = %db_path.display(), "Opening session database");
    let store = StoreFactory::open_session_store(&db_path).await?;

    let http_config = HttpConfig::new().with_optional_base_url(config.base_url.clone());
    let request_config = match config.request_timeout {
        Some(timeout) => http_config.clone().with_timeout(timeout),
        None => http_config.clone(),
    };
    let request_transport: Arc<dyn HttpTransportPort> =
        Arc::new(ReqwestTransport::new(&request_config)?);
    let transfer_transport: Arc<dyn HttpTransportPort> =
        Arc::new(ReqwestTransport::new(&http_config)?);

    let http = HttpClient::new(request_transport, Arc::new(RequestRegistry::new()));

    let downloads = Arc::new(DownloadManagerImpl::new(
        DownloadManagerDeps {
            store: Arc::clone(&store),
            transport: Arc::clone(&transfer_transport),
        },
        config.download.clone(),
    ));

    let download_dir = match &config.data_dir {
        Some(dir) => dir.join("downloads"),
        None => default_download_dir()?,
    };

    Ok(CliContext {
        http,
        downloads,
        store,
        download_dir,
        config,
        transfer_transport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_with_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..CliConfig::default()
        };

        let ctx = bootstrap(config).await.unwrap();

        assert!(dir.path().join(DATABASE_FILE).exists());
        assert_eq!(ctx.download_dir, dir.path().join("downloads"));
        assert!(ctx.http().registry().is_empty());
        assert_eq!(ctx.downloads().config().buffer_size, 64 * 1024);
    }
}
