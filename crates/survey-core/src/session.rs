// ── Session ──
//
// Owns one front-end session: the backend handle, the notification
// channel, the reload coordinator, every entity provider and the
// selection context. Everything is created here and handed to its users;
// there is no process-wide state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use survey_api::{Backend, EventStream, HttpBackend, InvokeClient, ReconnectConfig, TransportConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{Building, BuildingKey, EntityKind, Fixture, PvUnit, Room, Utility};
use crate::notify::{NotificationChannel, NotificationKind};
use crate::provider::{MountedProvider, Provider};
use crate::reload::{ParticipantId, ReloadCoordinator};
use crate::selection::SelectionContext;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Construction wires the
/// components together; [`start()`](Self::start) mounts the providers and
/// spawns the listeners, [`shutdown()`](Self::shutdown) tears them down.
pub struct Session<B: Backend> {
    inner: Arc<SessionInner<B>>,
}

impl<B: Backend> Clone for Session<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<B: Backend> {
    backend: Arc<B>,
    notifications: NotificationChannel,
    reload: ReloadCoordinator,
    buildings: Provider<Building, B>,
    rooms: Provider<Room, B>,
    fixtures: Provider<Fixture, B>,
    utilities: Provider<Utility, B>,
    photovoltaic: Provider<PvUnit, B>,
    selection: SelectionContext<B>,
    watchdog: Option<Duration>,
    cancel: Mutex<Option<CancellationToken>>,
    mounted: Mutex<Vec<MountedProvider>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: Backend> Session<B> {
    /// Wire a session around `backend`. Nothing runs until `start()`.
    /// `watchdog` is the stalled-reload timeout; `None` disables it.
    pub fn new(backend: B, watchdog: Option<Duration>) -> Self {
        let backend = Arc::new(backend);
        let notifications = NotificationChannel::new();
        let reload = ReloadCoordinator::new(notifications.clone());

        let buildings = Provider::new(Arc::clone(&backend), notifications.clone(), reload.clone());
        let selection = SelectionContext::new(
            Arc::clone(&backend),
            buildings.clone(),
            notifications.clone(),
            reload.clone(),
        );
        let selected = selection.watch();

        let rooms = Provider::with_selection(
            Arc::clone(&backend),
            notifications.clone(),
            reload.clone(),
            selected.clone(),
        );
        let fixtures = Provider::with_selection(
            Arc::clone(&backend),
            notifications.clone(),
            reload.clone(),
            selected.clone(),
        );
        let utilities = Provider::with_selection(
            Arc::clone(&backend),
            notifications.clone(),
            reload.clone(),
            selected.clone(),
        );
        let photovoltaic = Provider::with_selection(
            Arc::clone(&backend),
            notifications.clone(),
            reload.clone(),
            selected,
        );

        Self {
            inner: Arc::new(SessionInner {
                backend,
                notifications,
                reload,
                buildings,
                rooms,
                fixtures,
                utilities,
                photovoltaic,
                selection,
                watchdog,
                cancel: Mutex::new(None),
                mounted: Mutex::new(Vec::new()),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Mount every provider (each performs its initial fetch) and spawn
    /// the event listener, the reload listener and the watchdog.
    /// Calling it on a running session does nothing.
    pub async fn start(&self) {
        let mut cancel_slot = self.inner.cancel.lock().await;
        if cancel_slot.is_some() {
            debug!("session already started");
            return;
        }
        let cancel = CancellationToken::new();

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(
            self.inner
                .selection
                .spawn_reload_listener(self.inner.reload.subscribe(), cancel.clone()),
        );
        handles.push(
            self.inner
                .selection
                .spawn_event_listener(self.inner.backend.subscribe(), cancel.clone()),
        );
        if let Some(timeout) = self.inner.watchdog {
            handles.push(self.inner.reload.spawn_watchdog(timeout, cancel.clone()));
        }

        let mut mounted = self.inner.mounted.lock().await;
        mounted.push(self.inner.buildings.mount());
        mounted.push(self.inner.rooms.mount());
        mounted.push(self.inner.fixtures.mount());
        mounted.push(self.inner.utilities.mount());
        mounted.push(self.inner.photovoltaic.mount());

        *cancel_slot = Some(cancel);
        info!(providers = mounted.len(), "session started");
    }

    /// Unmount providers, stop background tasks, clear local state, and
    /// ask the backend to close its storage. A failing close is logged,
    /// never returned.
    pub async fn shutdown(&self) {
        if let Some(cancel) = self.inner.cancel.lock().await.take() {
            cancel.cancel();
        }

        let mounted: Vec<MountedProvider> = self.inner.mounted.lock().await.drain(..).collect();
        for provider in mounted {
            provider.unmount().await;
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.backend.disconnect();

        self.inner.buildings.clear();
        self.inner.rooms.clear();
        self.inner.fixtures.clear();
        self.inner.utilities.clear();
        self.inner.photovoltaic.clear();
        self.inner.selection.clear();

        if let Err(e) = self.inner.backend.close_database().await {
            warn!(error = %e, "closing backend storage failed (non-fatal)");
        }
        info!("session shut down");
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Switch the backend's dataset and reload every provider.
    pub async fn request_switch(&self, target: &str) -> Result<(), CoreError> {
        self.inner
            .reload
            .request_switch(self.inner.backend.as_ref(), target)
            .await
    }

    pub async fn select_building(&self, key: &BuildingKey) -> Result<Arc<Building>, CoreError> {
        self.inner.selection.select(key).await
    }

    /// Hand a spreadsheet to the backend. Its results arrive later as
    /// pushed events.
    pub async fn import_spreadsheet(&self, path: &Path) -> Result<(), CoreError> {
        match self.inner.backend.import_spreadsheet(path).await {
            Ok(()) => {
                info!(path = %path.display(), "spreadsheet import started");
                self.inner.notifications.add(
                    format!("Importing {}", path.display()),
                    NotificationKind::Info,
                );
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(path = %path.display(), error = %err, "spreadsheet import failed");
                self.inner
                    .notifications
                    .add(err.to_string(), NotificationKind::Error);
                Err(err)
            }
        }
    }

    /// Refetch one kind's collection outside of a reload.
    pub async fn refetch(&self, kind: EntityKind) -> Result<usize, CoreError> {
        match kind {
            EntityKind::Buildings => self.inner.buildings.fetch_all().await,
            EntityKind::Rooms => self.inner.rooms.fetch_all().await,
            EntityKind::Fixtures => self.inner.fixtures.fetch_all().await,
            EntityKind::Utilities => self.inner.utilities.fetch_all().await,
            EntityKind::Photovoltaic => self.inner.photovoltaic.fetch_all().await,
        }
    }

    /// Number of locally held records of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Buildings => self.inner.buildings.len(),
            EntityKind::Rooms => self.inner.rooms.len(),
            EntityKind::Fixtures => self.inner.fixtures.len(),
            EntityKind::Utilities => self.inner.utilities.len(),
            EntityKind::Photovoltaic => self.inner.photovoltaic.len(),
        }
    }

    /// Record counts for every kind, in declaration order.
    pub fn counts(&self) -> Vec<(EntityKind, usize)> {
        EntityKind::iter().map(|k| (k, self.count(k))).collect()
    }

    /// Give up on a stalled reload. See [`ReloadCoordinator::abandon_reload`].
    pub fn abandon_reload(&self) -> Vec<ParticipantId> {
        self.inner.reload.abandon_reload()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.reload.is_loading()
    }

    /// Stalled-reload timeout, if the watchdog is enabled.
    pub fn watchdog(&self) -> Option<Duration> {
        self.inner.watchdog
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    pub fn notifications(&self) -> &NotificationChannel {
        &self.inner.notifications
    }

    pub fn reload(&self) -> &ReloadCoordinator {
        &self.inner.reload
    }

    pub fn selection(&self) -> &SelectionContext<B> {
        &self.inner.selection
    }

    pub fn buildings(&self) -> &Provider<Building, B> {
        &self.inner.buildings
    }

    pub fn rooms(&self) -> &Provider<Room, B> {
        &self.inner.rooms
    }

    pub fn fixtures(&self) -> &Provider<Fixture, B> {
        &self.inner.fixtures
    }

    pub fn utilities(&self) -> &Provider<Utility, B> {
        &self.inner.utilities
    }

    pub fn photovoltaic(&self) -> &Provider<PvUnit, B> {
        &self.inner.photovoltaic
    }
}

// ── HTTP session ─────────────────────────────────────────────────────

impl Session<HttpBackend> {
    /// Build the HTTP backend described by `config` and wrap it.
    ///
    /// Must be called inside a Tokio runtime when an event endpoint is
    /// configured: the event stream task starts immediately.
    pub fn connect(config: &SessionConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            auth_token: config.auth_token.clone(),
        };
        let client = InvokeClient::new(config.backend_url.clone(), &transport)?;

        let backend = match &config.events_url {
            Some(url) => {
                let reconnect = ReconnectConfig {
                    initial_delay: config.reconnect_initial_delay,
                    max_delay: config.reconnect_max_delay,
                    max_retries: None,
                };
                let events =
                    EventStream::connect(url.clone(), &transport, reconnect, CancellationToken::new())?;
                HttpBackend::with_events(client, events)
            }
            None => HttpBackend::new(client),
        };

        info!(backend = %config.backend_url, events = config.events_url.is_some(), "session configured");
        Ok(Self::new(backend, config.watchdog()))
    }
}
