// ── Selected-building context ──
//
// Tracks the active building. It changes on explicit selection (persisted
// through the backend first) and on backend-pushed events, which are
// resolved against the buildings collection. A separate listener clears
// the loading indicator when a reload finishes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use survey_api::{Backend, BackendEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::model::{Building, BuildingKey};
use crate::notify::{NotificationChannel, NotificationKind};
use crate::provider::Provider;
use crate::reload::{ReloadCoordinator, ReloadSignal};

struct SelectionInner<B: Backend> {
    backend: Arc<B>,
    buildings: Provider<Building, B>,
    notifications: NotificationChannel,
    reload: ReloadCoordinator,
    current: watch::Sender<Option<Arc<Building>>>,
    loading: watch::Sender<bool>,
    last_error: Mutex<Option<CoreError>>,
}

/// Shared handle to the active-building state. Cloning is cheap.
pub struct SelectionContext<B: Backend> {
    inner: Arc<SelectionInner<B>>,
}

impl<B: Backend> Clone for SelectionContext<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> SelectionContext<B> {
    pub fn new(
        backend: Arc<B>,
        buildings: Provider<Building, B>,
        notifications: NotificationChannel,
        reload: ReloadCoordinator,
    ) -> Self {
        let (current, _) = watch::channel(None);
        let (loading, _) = watch::channel(false);
        Self {
            inner: Arc::new(SelectionInner {
                backend,
                buildings,
                notifications,
                reload,
                current,
                loading,
                last_error: Mutex::new(None),
            }),
        }
    }

    // ── State ────────────────────────────────────────────────────────

    /// The active building. Always a record of the buildings collection.
    pub fn current(&self) -> Option<Arc<Building>> {
        self.inner.current.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Arc<Building>>> {
        self.inner.current.subscribe()
    }

    /// `true` between a reload request and its completion.
    pub fn loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    /// The last consistency error, kept until the next successful
    /// resolution.
    pub fn last_error(&self) -> Option<CoreError> {
        self.error_slot().clone()
    }

    fn error_slot(&self) -> MutexGuard<'_, Option<CoreError>> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn resolved(&self, building: Arc<Building>) {
        *self.error_slot() = None;
        self.inner.current.send_replace(Some(building));
    }

    fn inconsistent(&self, err: CoreError) -> CoreError {
        error!(error = %err, "backend and local buildings disagree");
        self.inner
            .notifications
            .add(err.to_string(), NotificationKind::Error);
        *self.error_slot() = Some(err.clone());
        err
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Persist the selection through the backend, then make it current.
    /// On failure `current` is unchanged.
    pub async fn select(&self, key: &BuildingKey) -> Result<Arc<Building>, CoreError> {
        let Some(building) = self.inner.buildings.find(key) else {
            return Err(self.inconsistent(CoreError::BuildingNotFound { key: key.clone() }));
        };

        if let Err(e) = self.inner.backend.select_building(key).await {
            let err = CoreError::from(e);
            warn!(%key, error = %err, "building selection failed");
            self.inner
                .notifications
                .add(err.to_string(), NotificationKind::Error);
            return Err(err);
        }

        info!(%key, "building selected");
        self.resolved(Arc::clone(&building));
        Ok(building)
    }

    // ── Backend events ───────────────────────────────────────────────

    /// Resolve one pushed event against the buildings collection.
    ///
    /// Unknown keys and unknown event tags are consistency errors: they
    /// are posted, retained as `last_error`, and leave `current` alone.
    pub fn handle_event(&self, event: BackendEvent) -> Result<(), CoreError> {
        match event {
            BackendEvent::BuildingChanged { key } => match self.inner.buildings.find(&key) {
                Some(building) => {
                    info!(%key, "backend switched building");
                    self.resolved(building);
                    self.inner.reload.signal_reload();
                    Ok(())
                }
                None => Err(self.inconsistent(CoreError::BuildingNotFound { key })),
            },
            BackendEvent::NewBuilding {
                buildings,
                selected_key,
            } => {
                let count = buildings.len();
                match self
                    .inner
                    .buildings
                    .merge_and_find(buildings, &selected_key)
                {
                    Some(building) => {
                        info!(count, key = %selected_key, "new buildings arrived");
                        self.resolved(building);
                        Ok(())
                    }
                    None => Err(self.inconsistent(CoreError::BuildingNotFound {
                        key: selected_key,
                    })),
                }
            }
            BackendEvent::Unrecognized { tag } => {
                Err(self.inconsistent(CoreError::UnrecognizedEvent { tag }))
            }
        }
    }

    /// Keep `current` pointing at a live record after the buildings were
    /// refetched; drop it when its key is gone.
    fn reconcile(&self) {
        let Some(current) = self.current() else {
            return;
        };
        match self.inner.buildings.find(&current.key) {
            Some(fresh) if Arc::ptr_eq(&fresh, &current) => {}
            Some(fresh) => {
                self.inner.current.send_replace(Some(fresh));
            }
            None => {
                info!(key = %current.key, "selected building is no longer loaded");
                self.inner.current.send_replace(None);
            }
        }
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Apply every pushed event until `cancel` fires.
    pub fn spawn_event_listener(
        &self,
        mut events: broadcast::Receiver<BackendEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => {
                            debug!(tag = event.tag(), "backend event received");
                            // Failures are posted and retained by handle_event.
                            let _ = ctx.handle_event(event);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged behind backend events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("event listener exiting");
        })
    }

    /// Track reload progress in `loading()` until `cancel` fires.
    pub fn spawn_reload_listener(
        &self,
        mut signals: broadcast::Receiver<ReloadSignal>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Ok(ReloadSignal::Requested { .. }) => {
                            ctx.inner.loading.send_replace(true);
                        }
                        Ok(ReloadSignal::Finished { .. }) => {
                            ctx.inner.loading.send_replace(false);
                            ctx.reconcile();
                        }
                        Err(RecvError::Lagged(_)) => {
                            ctx.inner.loading.send_replace(ctx.inner.reload.need_reload());
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("reload listener exiting");
        })
    }

    /// Forget the active building (used on shutdown).
    pub fn clear(&self) {
        self.inner.current.send_replace(None);
        self.inner.loading.send_replace(false);
        *self.error_slot() = None;
    }
}
