//! History coordinator: local-first writes with a best-effort remote mirror.
//!
//! Every record is either Local-Only (`synced == false`) or Mirrored. Local
//! writes must succeed and their errors are returned; mirror work runs in the
//! background, and its failures are logged and otherwise ignored until the
//! next `sync_pending`.
//!
//! At most one mirror operation (publish or delete) runs per id at a time.
//! A publish re-reads the record when it starts and only marks it synced if
//! the stored photo reference is still the one it uploaded.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio_util::task::TaskTracker;

use crate::error::{HistoryResult, StoreResult};
use crate::mirror::{photo_exists, RemoteMirror};
use crate::record::{HistoryChange, HistoryRecord, NewHistoryRecord};
use crate::store::HistoryStore;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Outcome of one `sync_pending` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records a publish was attempted for
    pub attempted: usize,
    /// Records now marked synced
    pub mirrored: usize,
    /// Records that stay Local-Only
    pub failed: usize,
    /// Records skipped because another mirror operation was running for
    /// them, or because they were deleted before their turn
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct InFlightIds {
    ids: Mutex<HashSet<i64>>,
    released: Notify,
}

/// Ids with a mirror operation currently running.
#[derive(Debug, Default, Clone)]
struct InFlight(Arc<InFlightIds>);

impl InFlight {
    /// Claim an id; `None` if an operation for it is already running.
    fn claim(&self, id: i64) -> Option<InFlightGuard> {
        if self.0.ids.lock().insert(id) {
            Some(InFlightGuard {
                set: self.clone(),
                id,
            })
        } else {
            None
        }
    }

    /// Claim an id, waiting for a running operation on it to finish first.
    async fn claim_when_free(&self, id: i64) -> InFlightGuard {
        loop {
            let released = self.0.released.notified();
            tokio::pin!(released);
            // Register before checking so a release in between is not missed
            released.as_mut().enable();

            if let Some(guard) = self.claim(id) {
                return guard;
            }
            released.await;
        }
    }
}

struct InFlightGuard {
    set: InFlight,
    id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.0.ids.lock().remove(&self.id);
        self.set.0.released.notify_waiters();
    }
}

/// What happened to one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PublishOutcome {
    Mirrored,
    Failed,
    /// Deleted locally before the publish started
    Gone,
    /// The photo changed while publishing; left Local-Only for the next pass
    Stale,
}

/// Orchestrates the local store and the remote mirror.
pub struct HistoryCoordinator<S, M> {
    store: Arc<Mutex<S>>,
    mirror: Arc<M>,
    changes: broadcast::Sender<HistoryChange>,
    tasks: TaskTracker,
    in_flight: InFlight,
}

impl<S, M> Clone for HistoryCoordinator<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mirror: self.mirror.clone(),
            changes: self.changes.clone(),
            tasks: self.tasks.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

/// Run a store call on the blocking pool.
async fn run_store<S, T, F>(store: Arc<Mutex<S>>, f: F) -> HistoryResult<T>
where
    S: HistoryStore + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> StoreResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || f(&store.lock())).await?;
    Ok(result?)
}

/// Publish the current stored state of one record and mark it synced if it
/// did not change meanwhile. The caller must hold the id's in-flight claim.
async fn publish_and_mark<S, M>(
    store: Arc<Mutex<S>>,
    mirror: Arc<M>,
    changes: broadcast::Sender<HistoryChange>,
    id: i64,
) -> PublishOutcome
where
    S: HistoryStore + 'static,
    M: RemoteMirror,
{
    let record = match run_store(store.clone(), move |s| s.get(id)).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::debug!("Record {} deleted before publish", id);
            return PublishOutcome::Gone;
        }
        Err(e) => {
            tracing::warn!("Could not read record {} for publish: {}", id, e);
            return PublishOutcome::Failed;
        }
    };

    if let Err(e) = mirror.publish(&record).await {
        tracing::warn!(
            "Mirror publish for record {} failed (transient: {}): {}",
            id,
            e.is_transient(),
            e
        );
        return PublishOutcome::Failed;
    }

    let published_photo = record.photo_ref;
    match run_store(store, move |s| s.mark_synced(id, &published_photo)).await {
        Ok(true) => {
            let _ = changes.send(HistoryChange::Synced(id));
            PublishOutcome::Mirrored
        }
        Ok(false) => {
            tracing::info!("Record {} changed while publishing; left for the next sync", id);
            PublishOutcome::Stale
        }
        Err(e) => {
            // The remote copy exists; the next pass rewrites it harmlessly
            tracing::error!("Record {} mirrored but marking it synced failed: {}", id, e);
            PublishOutcome::Failed
        }
    }
}

impl<S, M> HistoryCoordinator<S, M>
where
    S: HistoryStore + 'static,
    M: RemoteMirror,
{
    /// Create a coordinator owning an opened store and a mirror client.
    pub fn new(store: S, mirror: M) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store: Arc::new(Mutex::new(store)),
            mirror: Arc::new(mirror),
            changes,
            tasks: TaskTracker::new(),
            in_flight: InFlight::default(),
        }
    }

    /// The mirror this coordinator publishes to.
    pub fn mirror(&self) -> &M {
        &self.mirror
    }

    /// Subscribe to change notifications; re-pull `history()` on each event.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: HistoryChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    async fn with_store<T, F>(&self, f: F) -> HistoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> StoreResult<T> + Send + 'static,
    {
        run_store(self.store.clone(), f).await
    }

    /// Spawn a background publish unless one is already running for the record.
    fn spawn_publish(&self, id: i64) -> bool {
        let Some(guard) = self.in_flight.claim(id) else {
            tracing::debug!("Publish for record {} already in flight", id);
            return false;
        };

        let store = self.store.clone();
        let mirror = self.mirror.clone();
        let changes = self.changes.clone();
        self.tasks.spawn(async move {
            let _guard = guard;
            publish_and_mark(store, mirror, changes, id).await;
        });
        true
    }

    /// Store a new UV check and start mirroring it in the background.
    ///
    /// Returns the new id as soon as the local insert succeeded; mirror
    /// failures leave the record Local-Only for a later `sync_pending`.
    pub async fn record_check(&self, record: NewHistoryRecord) -> HistoryResult<i64> {
        let uv_index = record.uv_index;
        let id = self.with_store(move |s| s.insert(&record)).await?;

        tracing::info!("Recorded UV check {} (uv {:.1})", id, uv_index);
        self.notify(HistoryChange::Inserted(id));
        self.spawn_publish(id);
        Ok(id)
    }

    /// Retry the mirror for every Local-Only record.
    ///
    /// Records are published independently: one failure does not stop the
    /// others. Only reading the pending list can fail.
    pub async fn sync_pending(&self) -> HistoryResult<SyncReport> {
        let pending = self.with_store(|s| s.unsynced()).await?;
        let mut report = SyncReport::default();

        if pending.is_empty() {
            tracing::debug!("No pending history records to mirror");
            return Ok(report);
        }
        tracing::info!("Mirroring {} pending history records", pending.len());

        for record in pending {
            let Some(_guard) = self.in_flight.claim(record.id) else {
                report.skipped += 1;
                continue;
            };

            let outcome = publish_and_mark(
                self.store.clone(),
                self.mirror.clone(),
                self.changes.clone(),
                record.id,
            )
            .await;

            match outcome {
                PublishOutcome::Mirrored => {
                    report.attempted += 1;
                    report.mirrored += 1;
                }
                PublishOutcome::Failed | PublishOutcome::Stale => {
                    report.attempted += 1;
                    report.failed += 1;
                }
                PublishOutcome::Gone => report.skipped += 1,
            }
        }

        tracing::info!(
            "Pending sync finished: {} mirrored, {} failed, {} skipped",
            report.mirrored,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    /// Run `sync_pending` in the background so local commands never wait
    /// on the mirror. `wait_idle` waits for it like any other mirror task.
    pub fn spawn_sync_pending(&self) {
        let coordinator = self.clone();
        self.tasks.spawn(async move {
            match coordinator.sync_pending().await {
                Ok(report) if report.failed > 0 => tracing::warn!(
                    "{} history records are still waiting for the mirror",
                    report.failed
                ),
                Ok(_) => {}
                Err(e) => tracing::error!("Pending sync could not read local history: {}", e),
            }
        });
    }

    /// Delete a record locally, then best-effort delete its mirror document.
    ///
    /// The remote delete waits for a publish of the same id that is already
    /// running, so the document cannot reappear after it.
    pub async fn delete_record(&self, id: i64) -> HistoryResult<()> {
        self.with_store(move |s| s.delete(id)).await?;
        self.notify(HistoryChange::Deleted(id));

        let mirror = self.mirror.clone();
        let in_flight = self.in_flight.clone();
        self.tasks.spawn(async move {
            let _guard = in_flight.claim_when_free(id).await;
            if let Err(e) = mirror.delete(id).await {
                tracing::warn!("Mirror delete for record {} failed: {}", id, e);
            }
        });
        Ok(())
    }

    /// Clear the local history. The mirror is not touched.
    pub async fn delete_all(&self) -> HistoryResult<()> {
        self.with_store(|s| s.delete_all()).await?;
        tracing::info!("Cleared local history");
        self.notify(HistoryChange::Cleared);
        Ok(())
    }

    /// Attach a captured photo to a record. The synced flag is left as is.
    pub async fn attach_photo(&self, id: i64, photo_ref: &str) -> HistoryResult<()> {
        let path = photo_ref.to_string();
        self.with_store(move |s| s.update_photo(id, &path)).await?;

        if let Some(record) = self.get(id).await? {
            if !photo_exists(&record) {
                tracing::warn!("Photo {} for record {} is not a readable file", photo_ref, id);
            }
        }
        self.notify(HistoryChange::PhotoAttached(id));
        Ok(())
    }

    /// All records, newest first.
    pub async fn history(&self) -> HistoryResult<Vec<HistoryRecord>> {
        self.with_store(|s| s.all()).await
    }

    pub async fn get(&self, id: i64) -> HistoryResult<Option<HistoryRecord>> {
        self.with_store(move |s| s.get(id)).await
    }

    /// Records still waiting for the mirror.
    pub async fn unsynced(&self) -> HistoryResult<Vec<HistoryRecord>> {
        self.with_store(|s| s.unsynced()).await
    }

    pub async fn count(&self) -> HistoryResult<usize> {
        self.with_store(|s| s.count()).await
    }

    /// Wait for every background publish and delete spawned so far.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
