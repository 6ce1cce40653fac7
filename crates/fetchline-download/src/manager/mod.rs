//! Download manager implementation.
//!
//! Owns the set of active transfers and implements [`DownloadManagerPort`].
//! Each started session gets its own task; stop and remove signal that task
//! and return without waiting for it.

mod signal;
mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use fetchline_core::{
    DownloadError, DownloadManagerConfig, DownloadManagerPort, DownloadResult, DownloadSession,
    DownloadSessionStorePort, HttpTransportPort, SessionId, SessionState,
};

use signal::{SessionSlot, StopIntent, StopSignal};
use worker::{TransferJob, TransferOutcome, WorkerDeps, remove_file_if_exists, run_transfer};

/// Unique identifier for one transfer task of a session.
///
/// A session can be started, stopped and started again before the first
/// task has wound down. The lease lets a finishing task tell whether the
/// active entry still belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeaseId(u64);

/// Tracking data for the current transfer of a session.
struct ActiveTransfer {
    lease: LeaseId,
    signal: Arc<StopSignal>,
}

/// Dependencies for building a download manager.
pub struct DownloadManagerDeps {
    pub store: Arc<dyn DownloadSessionStorePort>,
    pub transport: Arc<dyn HttpTransportPort>,
}

/// Build a download manager behind its port.
pub fn build_download_manager(
    deps: DownloadManagerDeps,
    config: DownloadManagerConfig,
) -> Arc<dyn DownloadManagerPort> {
    Arc::new(DownloadManagerImpl::new(deps, config))
}

/// State shared with spawned transfer tasks.
struct Shared {
    deps: WorkerDeps,
    active: Mutex<HashMap<SessionId, ActiveTransfer>>,
    slots: StdMutex<HashMap<SessionId, Arc<SessionSlot>>>,
    lease_counter: AtomicU64,
}

impl Shared {
    fn next_lease(&self) -> LeaseId {
        LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Slot for `id`, created on first use.
    fn slot(&self, id: &SessionId) -> Arc<SessionSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(id.clone()).or_default())
    }

    /// Drop the caller's slot reference and forget the slot if nobody else
    /// holds it.
    fn release_slot(&self, id: &SessionId, slot: Arc<SessionSlot>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references: the map and `slot`.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(id);
        }
    }

    /// Remove the active entry for `id` only if it still carries `lease`.
    async fn verify_and_remove_lease(&self, id: &SessionId, lease: LeaseId) -> bool {
        let mut active = self.active.lock().await;
        if active.get(id).is_some_and(|entry| entry.lease == lease) {
            active.remove(id);
            return true;
        }
        false
    }

    async fn run(self: Arc<Self>, job: TransferJob, lease: LeaseId) {
        let id = job.session.id.clone();
        let slot = Arc::clone(&job.slot);

        match run_transfer(job, &self.deps).await {
            TransferOutcome::Failed(error) => debug!(
                target: "fetchline.download",
                id = %id,
                recoverable = error.is_recoverable(),
                "Transfer task finished with failure"
            ),
            outcome => {
                debug!(target: "fetchline.download", id = %id, outcome = ?outcome, "Transfer task finished");
            }
        }

        if !self.verify_and_remove_lease(&id, lease).await {
            debug!(target: "fetchline.download", id = %id, lease = lease.0, "Active entry superseded");
        }
        self.release_slot(&id, slot);
    }
}

/// Download manager backed by a session store and an HTTP transport.
pub struct DownloadManagerImpl {
    shared: Arc<Shared>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl DownloadManagerImpl {
    pub fn new(deps: DownloadManagerDeps, config: DownloadManagerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                deps: WorkerDeps {
                    store: deps.store,
                    transport: deps.transport,
                    config,
                },
                active: Mutex::new(HashMap::new()),
                slots: StdMutex::new(HashMap::new()),
                lease_counter: AtomicU64::new(1),
            }),
            tasks: StdMutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &DownloadManagerConfig {
        &self.shared.deps.config
    }

    fn store(&self) -> &dyn DownloadSessionStorePort {
        self.shared.deps.store.as_ref()
    }

    /// Whether `id` has a transfer that has not been stopped.
    pub async fn is_active(&self, id: &SessionId) -> bool {
        self.shared.active.lock().await.contains_key(id)
    }

    /// Number of transfers that have not been stopped.
    pub async fn active_count(&self) -> usize {
        self.shared.active.lock().await.len()
    }

    /// Persisted record for `id`, if any.
    pub async fn session(&self, id: &SessionId) -> DownloadResult<Option<DownloadSession>> {
        Ok(self.store().load(id).await?)
    }

    /// Bring `session` up to date with its persisted record.
    ///
    /// The caller's callback is kept. A session with no record is returned
    /// unchanged, ready to be started.
    pub async fn restore_session(
        &self,
        mut session: DownloadSession,
    ) -> DownloadResult<DownloadSession> {
        if let Some(stored) = self.store().load(&session.id).await? {
            session.merge_persisted(&stored);
        }
        Ok(session)
    }

    /// Mark records left `Downloading` by a previous process as `Paused`.
    ///
    /// Returns the number of records changed.
    pub async fn recover_interrupted(&self) -> DownloadResult<usize> {
        let active = self.shared.active.lock().await;
        let mut recovered = 0;
        for mut session in self.store().list_unfinished().await? {
            if session.state != SessionState::Downloading || active.contains_key(&session.id) {
                continue;
            }
            session.transition(SessionState::Paused);
            self.store().save(&session).await?;
            recovered += 1;
        }
        if recovered > 0 {
            info!(target: "fetchline.download", recovered, "Recovered interrupted downloads");
        }
        Ok(recovered)
    }

    /// Wait until every spawned transfer task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let pending = std::mem::take(
                &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if let Err(e) = task.await {
                    warn!(target: "fetchline.download", error = %e, "Transfer task panicked");
                }
            }
        }
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Pause every active transfer and wait for all tasks to wind down.
    ///
    /// Returns the number of transfers paused.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.shared.active.lock().await.drain().collect();
        for (id, entry) in &drained {
            debug!(target: "fetchline.download", id = %id, "Pausing on shutdown");
            entry.signal.stop(StopIntent::Pause);
        }
        self.wait_idle().await;
        info!(target: "fetchline.download", paused = drained.len(), "Download manager shut down");
        drained.len()
    }

    /// Best-effort synchronous cancel of all transfers.
    ///
    /// For `Drop` paths where awaiting is impossible. Tasks persist their
    /// pause if the runtime keeps polling them.
    pub fn shutdown_now(&self) {
        match self.shared.active.try_lock() {
            Ok(mut active) => {
                for (_, entry) in active.drain() {
                    entry.signal.stop(StopIntent::Pause);
                }
            }
            Err(_) => {
                warn!(target: "fetchline.download", "Active map busy during shutdown_now; transfers left running");
            }
        }
    }
}

fn validate(session: &DownloadSession) -> DownloadResult<()> {
    if session.id.is_empty() {
        return Err(DownloadError::invalid_session("session id is empty"));
    }
    if session.remote_url.trim().is_empty() {
        return Err(DownloadError::invalid_session("remote URL is empty"));
    }
    if session.local_path.as_os_str().is_empty() {
        return Err(DownloadError::invalid_path("local path is empty"));
    }
    if session.local_path.to_str().is_none() {
        return Err(DownloadError::invalid_path(format!(
            "local path {} is not valid UTF-8",
            session.local_path.display()
        )));
    }
    Ok(())
}

#[async_trait]
impl DownloadManagerPort for DownloadManagerImpl {
    async fn start_download(&self, session: DownloadSession) -> Result<(), DownloadError> {
        validate(&session)?;
        if session.state == SessionState::Completed {
            return Err(DownloadError::invalid_session(format!(
                "session '{}' is already completed",
                session.id
            )));
        }

        let mut active = self.shared.active.lock().await;
        if active.contains_key(&session.id) {
            debug!(target: "fetchline.download", id = %session.id, "Transfer already active");
            return Ok(());
        }

        match self.store().load(&session.id).await? {
            Some(stored) if stored.state == SessionState::Completed => {
                return Err(DownloadError::invalid_session(format!(
                    "session '{}' is already completed",
                    session.id
                )));
            }
            Some(_) => {}
            None => self.store().save(&session).await?,
        }

        let slot = self.shared.slot(&session.id);
        let generation = *slot.generation.lock().await;
        let lease = self.shared.next_lease();
        let signal = Arc::new(StopSignal::new());
        active.insert(
            session.id.clone(),
            ActiveTransfer {
                lease,
                signal: Arc::clone(&signal),
            },
        );
        drop(active);

        info!(
            target: "fetchline.download",
            id = %session.id,
            url = %session.remote_url,
            path = %session.local_path.display(),
            "Starting download"
        );

        let job = TransferJob {
            session,
            signal,
            slot,
            generation,
        };
        self.track(tokio::spawn(Arc::clone(&self.shared).run(job, lease)));
        Ok(())
    }

    async fn stop_download(&self, session: &DownloadSession) -> Result<(), DownloadError> {
        let entry = self.shared.active.lock().await.remove(&session.id);
        match entry {
            Some(entry) => {
                info!(target: "fetchline.download", id = %session.id, "Pausing download");
                entry.signal.stop(StopIntent::Pause);
            }
            None => {
                debug!(target: "fetchline.download", id = %session.id, "No active transfer to stop");
            }
        }
        Ok(())
    }

    async fn remove_download(
        &self,
        session: &DownloadSession,
        delete_file: bool,
    ) -> Result<(), DownloadError> {
        if let Some(entry) = self.shared.active.lock().await.remove(&session.id) {
            entry.signal.stop(StopIntent::Remove { delete_file });
        }

        let slot = self.shared.slot(&session.id);
        let removed = async {
            let mut generation = slot.generation.lock().await;
            *generation += 1;
            let stored = self.store().load(&session.id).await?;
            let deleted = self.store().delete(&session.id).await?;
            Ok::<_, DownloadError>((stored, deleted))
        }
        .await;
        self.shared.release_slot(&session.id, slot);
        let (stored, deleted) = removed?;

        let mut snapshot = session.clone();
        if let Some(stored) = &stored {
            snapshot.merge_persisted(stored);
        }
        if delete_file {
            remove_file_if_exists(snapshot.local_path()).await?;
        }

        info!(
            target: "fetchline.download",
            id = %session.id,
            record_deleted = deleted,
            file_deleted = delete_file,
            "Download removed"
        );

        if let Some(callback) = snapshot.callback().cloned() {
            snapshot.transition(SessionState::Deleted);
            callback.on_progress(&snapshot);
        }
        Ok(())
    }

    async fn get_download_list(&self, kind: &str) -> Result<Vec<DownloadSession>, DownloadError> {
        Ok(self.store().list_all(kind).await?)
    }

    async fn get_download_count(&self) -> Result<u64, DownloadError> {
        Ok(self.store().count().await?)
    }
}

impl Drop for DownloadManagerImpl {
    fn drop(&mut self) {
        self.shutdown_now();
    }
}
