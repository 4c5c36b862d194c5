// ── Per-entity data providers ──
//
// One generic provider per entity kind. It owns the kind's collection,
// fetches it from the backend, applies confirmed mutations, and takes
// part in every reload for as long as it is mounted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strum::Display;
use survey_api::Backend;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Building, BuildingKey, Entity, EntityKind, Insert, Update, Validate};
use crate::notify::{NotificationChannel, NotificationKind};
use crate::reload::{CompletionHandle, Membership, ReloadCoordinator, ReloadSignal};
use crate::store::{EntityCollection, Snapshot};
use crate::stream::{SelectedView, filter_by_building};

/// Provider operations that keep their own error marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Fetch,
    Insert,
    Update,
}

/// Result of an update the backend accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<E> {
    /// The authoritative record, now merged into the collection.
    Updated(Arc<E>),
    /// The backend matched nothing; the collection is unchanged.
    NoRowsUpdated,
}

struct ProviderInner<E: Entity, B: Backend> {
    backend: Arc<B>,
    collection: EntityCollection<E>,
    notifications: NotificationChannel,
    reload: ReloadCoordinator,
    selected: Option<watch::Receiver<Option<Arc<Building>>>>,
    last_errors: Mutex<HashMap<Operation, CoreError>>,
}

/// Shared handle to one entity kind's state. Cloning is cheap.
pub struct Provider<E: Entity, B: Backend> {
    inner: Arc<ProviderInner<E, B>>,
}

impl<E: Entity, B: Backend> Clone for Provider<E, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity, B: Backend> fmt::Debug for Provider<E, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &E::KIND)
            .field("len", &self.inner.collection.len())
            .finish_non_exhaustive()
    }
}

impl<E: Entity, B: Backend> Provider<E, B> {
    /// A provider whose records are not narrowed by building selection.
    pub fn new(
        backend: Arc<B>,
        notifications: NotificationChannel,
        reload: ReloadCoordinator,
    ) -> Self {
        Self::build(backend, notifications, reload, None)
    }

    /// A provider that also exposes views filtered by `selected`.
    pub fn with_selection(
        backend: Arc<B>,
        notifications: NotificationChannel,
        reload: ReloadCoordinator,
        selected: watch::Receiver<Option<Arc<Building>>>,
    ) -> Self {
        Self::build(backend, notifications, reload, Some(selected))
    }

    fn build(
        backend: Arc<B>,
        notifications: NotificationChannel,
        reload: ReloadCoordinator,
        selected: Option<watch::Receiver<Option<Arc<Building>>>>,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                backend,
                collection: EntityCollection::new(),
                notifications,
                reload,
                selected,
                last_errors: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<E> {
        self.inner.collection.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.collection.is_empty()
    }

    pub fn find(&self, key: &E::Key) -> Option<Arc<E>> {
        self.inner.collection.find(|e| e.key() == *key)
    }

    pub fn for_building(&self, key: &BuildingKey) -> Vec<Arc<E>> {
        filter_by_building(&self.snapshot(), Some(key))
    }

    /// Records of the selected building. Empty when nothing is selected
    /// or the provider is not selection-aware.
    pub fn for_selected(&self) -> Vec<Arc<E>> {
        let selected = self
            .inner
            .selected
            .as_ref()
            .and_then(|rx| rx.borrow().clone());
        filter_by_building(&self.snapshot(), selected.as_ref().map(|b| &b.key))
    }

    /// A view recomputed on every collection or selection change.
    /// `None` for providers built without a selection.
    pub fn watch_selected(&self) -> Option<SelectedView<E>> {
        let selected = self.inner.selected.clone()?;
        Some(SelectedView::new(self.inner.collection.subscribe(), selected))
    }

    /// Error marker of the last failed `op`, cleared by its next success.
    pub fn last_error(&self, op: Operation) -> Option<CoreError> {
        self.errors().get(&op).cloned()
    }

    // ── Fetch ────────────────────────────────────────────────────────

    /// Replace the collection with the backend's. On failure the
    /// collection is left exactly as it was.
    pub async fn fetch_all(&self) -> Result<usize, CoreError> {
        match E::list(self.inner.backend.as_ref()).await {
            Ok(items) => {
                let count = items.len();
                self.inner.collection.replace_all(items);
                debug!(kind = %E::KIND, count, "collection fetched");
                self.succeeded(
                    Operation::Fetch,
                    format!("Loaded {count} {}", E::KIND.label()),
                );
                Ok(count)
            }
            Err(e) => Err(self.failed(Operation::Fetch, e.into())),
        }
    }

    /// Drop every local record (used on shutdown).
    pub fn clear(&self) {
        self.inner.collection.clear();
        self.errors().clear();
    }

    /// Merge `items` by key and resolve `key` in the result as one step.
    pub(crate) fn merge_and_find(&self, items: Vec<E>, key: &E::Key) -> Option<Arc<E>> {
        self.inner
            .collection
            .merge_and_find(items, |a, b| a.key() == b.key(), |e| e.key() == *key)
    }

    // ── Outcome reporting ────────────────────────────────────────────

    fn errors(&self) -> MutexGuard<'_, HashMap<Operation, CoreError>> {
        self.inner
            .last_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn succeeded(&self, op: Operation, message: String) {
        self.errors().remove(&op);
        self.inner
            .notifications
            .add(message, NotificationKind::Success);
    }

    fn failed(&self, op: Operation, err: CoreError) -> CoreError {
        warn!(kind = %E::KIND, operation = %op, error = %err, "provider operation failed");
        if let Some(kind) = err.notification_kind() {
            self.inner.notifications.add(err.to_string(), kind);
        }
        self.errors().insert(op, err.clone());
        err
    }

    // ── Reload binding ───────────────────────────────────────────────

    /// Join the reload protocol and start the provider's task: one initial
    /// fetch, then a refetch for every reload request. Dropping the
    /// returned guard unmounts.
    pub fn mount(&self) -> MountedProvider {
        let id = E::KIND.participant_id();
        let membership = self.inner.reload.join(id.clone());
        let initial = self.inner.reload.register(id);
        let signals = self.inner.reload.subscribe();

        let cancel = CancellationToken::new();
        let provider = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            provider.run(membership, initial, signals, task_cancel).await;
        });

        info!(kind = %E::KIND, "provider mounted");
        MountedProvider {
            kind: E::KIND,
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        self,
        _membership: Membership,
        initial: CompletionHandle,
        mut signals: broadcast::Receiver<ReloadSignal>,
        cancel: CancellationToken,
    ) {
        if !self.refetch(initial, &cancel).await {
            return;
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                signal = signals.recv() => match signal {
                    Ok(ReloadSignal::Requested { epoch }) => {
                        debug!(kind = %E::KIND, epoch, "reload requested, refetching");
                        let handle = self.inner.reload.register(E::KIND.participant_id());
                        if !self.refetch(handle, &cancel).await {
                            break;
                        }
                    }
                    Ok(ReloadSignal::Finished { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(kind = %E::KIND, skipped, "provider lagged behind reload signals");
                        if self.inner.reload.need_reload() {
                            let handle = self.inner.reload.register(E::KIND.participant_id());
                            if !self.refetch(handle, &cancel).await {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        debug!(kind = %E::KIND, "provider task exiting");
    }

    /// Fetch under `handle`. Completion is reported on every path, including
    /// cancellation, where the in-flight result is discarded. Returns
    /// `false` when cancelled.
    async fn refetch(&self, handle: CompletionHandle, cancel: &CancellationToken) -> bool {
        let completed = tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            // Failures are already posted and recorded by fetch_all.
            _ = self.fetch_all() => true,
        };
        handle.report_done();
        completed
    }
}

// ── Mutations ────────────────────────────────────────────────────────

impl<E: Insert, B: Backend> Provider<E, B> {
    /// Validate, send to the backend, and append the stored record it
    /// returns. Nothing is appended before the backend confirms.
    pub async fn insert(&self, new: &E::New) -> Result<Arc<E>, CoreError> {
        new.validate()?;
        match E::insert(self.inner.backend.as_ref(), new).await {
            Ok(record) => {
                let stored = self.inner.collection.append(record);
                debug!(kind = %E::KIND, key = ?stored.key(), "record inserted");
                self.succeeded(Operation::Insert, format!("{} added", E::KIND.singular()));
                Ok(stored)
            }
            Err(e) => Err(self.failed(Operation::Insert, e.into())),
        }
    }
}

impl<E: Update, B: Backend> Provider<E, B> {
    /// Validate, send to the backend, and merge the authoritative record
    /// into the matching local entry by key. Unmatched keys leave the
    /// collection alone. "No rows updated" is an informational outcome.
    pub async fn update(&self, patch: &E::Patch) -> Result<UpdateOutcome<E>, CoreError> {
        patch.validate()?;
        match E::update(self.inner.backend.as_ref(), patch).await {
            Ok(record) => {
                let key = record.key();
                let record = Arc::new(record);
                let merged = self
                    .inner
                    .collection
                    .replace_where(|e| e.key() == key, Arc::clone(&record));
                if !merged {
                    debug!(kind = %E::KIND, ?key, "updated record is not held locally");
                }
                self.succeeded(Operation::Update, format!("{} updated", E::KIND.singular()));
                Ok(UpdateOutcome::Updated(record))
            }
            Err(e) => {
                let err = CoreError::from(e);
                if err.is_informational() {
                    info!(kind = %E::KIND, key = ?E::patch_key(patch), "update matched no rows");
                    self.inner
                        .notifications
                        .add(err.to_string(), NotificationKind::Info);
                    self.errors().remove(&Operation::Update);
                    Ok(UpdateOutcome::NoRowsUpdated)
                } else {
                    Err(self.failed(Operation::Update, err))
                }
            }
        }
    }
}

// ── MountedProvider ─────────────────────────────────────────────────

/// Guard for a mounted provider task. Dropping it unmounts.
pub struct MountedProvider {
    kind: EntityKind,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MountedProvider {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Stop the task and wait for it to report any in-flight completion.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(kind = %self.kind, "provider unmounted");
    }
}

impl Drop for MountedProvider {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for MountedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedProvider")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
