//! Transfer task for a single download session.
//!
//! # Contract
//!
//! - Exactly one task writes a session's file at a time (the slot's
//!   transfer lock is held for the whole run)
//! - The persisted offset never exceeds the bytes flushed to disk
//! - Nothing is persisted once the session's generation moved on, which
//!   is how a removal keeps a winding-down task from resurrecting the record
//! - Callbacks fire from this task; `on_progress` is throttled during the
//!   transfer but never for state changes

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use fetchline_core::{
    DownloadError, DownloadManagerConfig, DownloadResult, DownloadSession,
    DownloadSessionStorePort, HttpTransportPort, RequestSpec, ResumePolicy, SessionState,
};

use super::signal::{SessionSlot, StopIntent, StopSignal};
use crate::progress::ProgressThrottle;

/// Collaborators shared by every transfer task.
pub(crate) struct WorkerDeps {
    pub(crate) store: Arc<dyn DownloadSessionStorePort>,
    pub(crate) transport: Arc<dyn HttpTransportPort>,
    pub(crate) config: DownloadManagerConfig,
}

/// Everything one transfer task needs.
pub(crate) struct TransferJob {
    pub(crate) session: DownloadSession,
    pub(crate) signal: Arc<StopSignal>,
    pub(crate) slot: Arc<SessionSlot>,
    /// Generation of the slot when the job was created.
    pub(crate) generation: u64,
}

/// How a transfer task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransferOutcome {
    Completed,
    Paused,
    Removed,
    Failed(DownloadError),
}

/// How the byte loop ended, before the stop intent is considered.
enum Finish {
    Completed,
    Stopped,
}

/// Run `job` to completion: transfer, persist the final state and notify.
pub(crate) async fn run_transfer(job: TransferJob, deps: &WorkerDeps) -> TransferOutcome {
    let TransferJob {
        mut session,
        signal,
        slot,
        generation,
    } = job;

    let writer = tokio::select! {
        biased;
        () = signal.stopped() => slot.transfer.try_lock().ok(),
        guard = slot.transfer.lock() => Some(guard),
    };

    let mut persist = Persister {
        store: deps.store.as_ref(),
        slot: &slot,
        generation,
        enabled: false,
    };

    let result = if writer.is_none() {
        // A previous task still owns the file and persists its own finish.
        if let Ok(Some(stored)) = deps.store.load(&session.id).await {
            session.merge_persisted(&stored);
        }
        debug!(target: "fetchline.download", id = %session.id, "Stopped before acquiring the transfer lock");
        Ok(Finish::Stopped)
    } else {
        match load_persisted(&mut session, deps).await {
            Ok(()) => {
                persist.enabled = true;
                if signal.is_stopped() {
                    Ok(Finish::Stopped)
                } else {
                    transfer(&mut session, &signal, &persist, deps).await
                }
            }
            Err(e) => Err(e),
        }
    };

    match result {
        Ok(Finish::Completed) => {
            session.error = None;
            session.transition(SessionState::Completed);
            if let Err(e) = persist.save(&session).await {
                warn!(target: "fetchline.download", id = %session.id, error = %e, "Failed to persist completion");
            }
            info!(
                target: "fetchline.download",
                id = %session.id,
                bytes = session.downloaded_bytes,
                "Download completed"
            );
            if let Some(callback) = session.callback() {
                callback.on_success(&session);
            }
            TransferOutcome::Completed
        }
        Ok(Finish::Stopped) => finish_stopped(session, &signal, &persist).await,
        Err(_) if signal.is_stopped() => finish_stopped(session, &signal, &persist).await,
        Err(error) => {
            session.error = Some(error.to_string());
            session.transition(SessionState::Failed);
            if let Err(e) = persist.save(&session).await {
                warn!(target: "fetchline.download", id = %session.id, error = %e, "Failed to persist failure");
            }
            warn!(target: "fetchline.download", id = %session.id, error = %error, "Download failed");
            if let Some(callback) = session.callback() {
                callback.on_error(&session, &error);
            }
            TransferOutcome::Failed(error)
        }
    }
}

async fn finish_stopped(
    mut session: DownloadSession,
    signal: &StopSignal,
    persist: &Persister<'_>,
) -> TransferOutcome {
    match signal.intent() {
        Some(StopIntent::Remove { delete_file }) => {
            if delete_file {
                if let Err(e) = remove_file_if_exists(session.local_path()).await {
                    warn!(target: "fetchline.download", id = %session.id, error = %e, "Failed to delete file");
                }
            }
            debug!(target: "fetchline.download", id = %session.id, "Transfer removed");
            TransferOutcome::Removed
        }
        Some(StopIntent::Pause) | None => {
            session.transition(SessionState::Paused);
            if let Err(e) = persist.save(&session).await {
                warn!(target: "fetchline.download", id = %session.id, error = %e, "Failed to persist pause");
            }
            info!(
                target: "fetchline.download",
                id = %session.id,
                bytes = session.downloaded_bytes,
                "Download paused"
            );
            if let Some(callback) = session.callback() {
                callback.on_progress(&session);
            }
            TransferOutcome::Paused
        }
    }
}

/// Store writes gated on the slot generation.
///
/// Disabled until the session has been merged with its stored record, so an
/// unmerged caller copy never overwrites persisted progress.
struct Persister<'a> {
    store: &'a dyn DownloadSessionStorePort,
    slot: &'a SessionSlot,
    generation: u64,
    enabled: bool,
}

impl Persister<'_> {
    async fn save(&self, session: &DownloadSession) -> DownloadResult<()> {
        if !self.enabled {
            debug!(target: "fetchline.download", id = %session.id, "Session not loaded; skipping save");
            return Ok(());
        }
        let current = self.slot.generation.lock().await;
        if *current != self.generation {
            debug!(target: "fetchline.download", id = %session.id, "Session removed; skipping save");
            return Ok(());
        }
        self.store.save(session).await?;
        Ok(())
    }
}

/// Merge the stored record into `session`. Must run under the transfer lock.
async fn load_persisted(session: &mut DownloadSession, deps: &WorkerDeps) -> DownloadResult<()> {
    if let Some(stored) = deps.store.load(&session.id).await? {
        session.merge_persisted(&stored);
    }
    Ok(())
}

async fn transfer(
    session: &mut DownloadSession,
    signal: &StopSignal,
    persist: &Persister<'_>,
    deps: &WorkerDeps,
) -> DownloadResult<Finish> {
    let path = session.local_path().to_path_buf();
    let on_disk = file_len(&path).await?;
    let mut offset = match deps.config.resume_policy {
        ResumePolicy::Resume => session.downloaded_bytes.min(on_disk),
        ResumePolicy::Restart => 0,
    };
    if offset == 0 {
        session.total_bytes = None;
    }

    let mut file = open_at(&path, offset).await?;
    session.downloaded_bytes = offset;

    if session.total_bytes.is_some_and(|total| total > 0 && offset >= total) {
        debug!(target: "fetchline.download", id = %session.id, "File already complete on disk");
        return Ok(Finish::Completed);
    }

    let spec = RequestSpec::get(session.remote_url.clone())
        .tag(session.id.as_str())
        .range_from(offset);
    let response = tokio::select! {
        biased;
        () = signal.stopped() => return Ok(Finish::Stopped),
        response = deps.transport.execute(&spec) => response?,
    };

    if offset > 0 && !response.partial {
        debug!(
            target: "fetchline.download",
            id = %session.id,
            offset,
            status = response.status,
            "Server ignored range; restarting from zero"
        );
        offset = 0;
        file.set_len(0).await.map_err(|e| DownloadError::from_io_error(&e))?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(|e| DownloadError::from_io_error(&e))?;
        session.downloaded_bytes = 0;
    }
    session.total_bytes = response.total_length(offset).or(session.total_bytes);
    session.error = None;
    session.transition(SessionState::Downloading);
    persist.save(session).await?;

    info!(
        target: "fetchline.download",
        id = %session.id,
        offset,
        total = ?session.total_bytes,
        "Transfer started"
    );

    let mut throttle = ProgressThrottle::new(deps.config.progress_interval);
    throttle.mark_emitted(session.downloaded_bytes);
    if let Some(callback) = session.callback() {
        callback.on_progress(session);
    }

    let buffer_size = deps.config.buffer_size;
    let mut buffer: Vec<u8> = Vec::with_capacity(buffer_size);
    let mut body = response.body;

    loop {
        let chunk = tokio::select! {
            biased;
            () = signal.stopped() => {
                if matches!(signal.intent(), Some(StopIntent::Pause) | None) {
                    flush(&mut file, &mut buffer, session).await?;
                }
                return Ok(Finish::Stopped);
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                buffer.extend_from_slice(&bytes);
                if buffer.len() >= buffer_size {
                    flush(&mut file, &mut buffer, session).await?;
                    persist.save(session).await?;
                    if throttle.should_emit(session.downloaded_bytes) {
                        if let Some(callback) = session.callback() {
                            callback.on_progress(session);
                        }
                    }
                }
            }
            Some(Err(e)) => {
                // Keep what already arrived so the next start resumes after it.
                flush(&mut file, &mut buffer, session).await?;
                return Err(e.into());
            }
            None => break,
        }
    }

    flush(&mut file, &mut buffer, session).await?;
    file.sync_data()
        .await
        .map_err(|e| DownloadError::from_io_error(&e))?;

    match session.total_bytes {
        Some(total) if session.downloaded_bytes < total => Err(DownloadError::Interrupted {
            bytes_downloaded: session.downloaded_bytes,
        }),
        Some(_) => Ok(Finish::Completed),
        None => {
            session.total_bytes = Some(session.downloaded_bytes);
            Ok(Finish::Completed)
        }
    }
}

/// Write the buffer out and advance the session offset.
async fn flush(
    file: &mut File,
    buffer: &mut Vec<u8>,
    session: &mut DownloadSession,
) -> DownloadResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let io = |e: std::io::Error| DownloadError::from_io_error(&e);
    file.write_all(buffer).await.map_err(io)?;
    file.flush().await.map_err(io)?;
    session.downloaded_bytes += buffer.len() as u64;
    buffer.clear();
    Ok(())
}

async fn file_len(path: &Path) -> DownloadResult<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Err(DownloadError::invalid_path(format!(
            "{} is a directory",
            path.display()
        ))),
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(DownloadError::from_io_error(&e)),
    }
}

/// Open `path` for writing with its length cut to `offset`, positioned there.
async fn open_at(path: &Path, offset: u64) -> DownloadResult<File> {
    let io = |e: std::io::Error| DownloadError::from_io_error(&e);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(io)?;
    file.set_len(offset).await.map_err(io)?;
    file.seek(SeekFrom::Start(offset)).await.map_err(io)?;
    Ok(file)
}

/// Delete `path`, treating a missing file as success.
pub(crate) async fn remove_file_if_exists(path: &Path) -> DownloadResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DownloadError::from_io_error(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_at_truncates_to_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.bin");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let mut file = open_at(&path, 4).await.unwrap();
        file.write_all(b"xy").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"0123xy");
    }

    #[tokio::test]
    async fn test_open_at_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("file.bin");

        open_at(&path, 0).await.unwrap();

        assert_eq!(file_len(&path).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_len_missing_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(file_len(&dir.path().join("missing")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_len_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_len(dir.path()).await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_if_exists(&dir.path().join("missing")).await.unwrap();
    }
}
