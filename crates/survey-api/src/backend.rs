// ── Backend abstraction ──
//
// The consumed capabilities of the backend process, as one trait. The
// state layer is generic over `Backend` so tests can drive it with a
// scripted in-memory implementation; `HttpBackend` is the production one.

use std::future::Future;
use std::path::Path;

use tokio::sync::broadcast;

use crate::error::Error;
use crate::events::{BackendEvent, EventStream};
use crate::invoke::InvokeClient;
use crate::records::{
    Building, BuildingKey, BuildingUpdate, Fixture, FixtureUpdate, NewFixture, NewUtility, PvUnit,
    Room, Utility,
};

/// Everything the front end asks of the backend process.
///
/// Commands are request/response; pushed events arrive independently
/// through [`subscribe`](Self::subscribe).
pub trait Backend: Send + Sync + 'static {
    // ── Dataset ──────────────────────────────────────────────────────

    fn switch_dataset(&self, target: &str) -> impl Future<Output = Result<(), Error>> + Send;

    fn import_spreadsheet(&self, path: &Path) -> impl Future<Output = Result<(), Error>> + Send;

    fn close_database(&self) -> impl Future<Output = Result<(), Error>> + Send;

    // ── Buildings ────────────────────────────────────────────────────

    fn list_buildings(&self) -> impl Future<Output = Result<Vec<Building>, Error>> + Send;

    fn update_building(
        &self,
        update: &BuildingUpdate,
    ) -> impl Future<Output = Result<Building, Error>> + Send;

    fn select_building(&self, key: &BuildingKey) -> impl Future<Output = Result<(), Error>> + Send;

    // ── Rooms ────────────────────────────────────────────────────────

    fn list_rooms(&self) -> impl Future<Output = Result<Vec<Room>, Error>> + Send;

    fn update_room(&self, room: &Room) -> impl Future<Output = Result<(), Error>> + Send;

    // ── Fixtures ─────────────────────────────────────────────────────

    fn list_fixtures(&self) -> impl Future<Output = Result<Vec<Fixture>, Error>> + Send;

    fn insert_fixture(
        &self,
        fixture: &NewFixture,
    ) -> impl Future<Output = Result<Fixture, Error>> + Send;

    fn update_fixture(
        &self,
        update: &FixtureUpdate,
    ) -> impl Future<Output = Result<Fixture, Error>> + Send;

    // ── Utilities ────────────────────────────────────────────────────

    fn list_utilities(&self) -> impl Future<Output = Result<Vec<Utility>, Error>> + Send;

    fn insert_utility(
        &self,
        utility: &NewUtility,
    ) -> impl Future<Output = Result<Utility, Error>> + Send;

    // ── Photovoltaic ─────────────────────────────────────────────────

    fn list_photovoltaic(&self) -> impl Future<Output = Result<Vec<PvUnit>, Error>> + Send;

    // ── Events ───────────────────────────────────────────────────────

    /// A fresh receiver for pushed events.
    fn subscribe(&self) -> broadcast::Receiver<BackendEvent>;

    /// Stop any background event machinery. Default: nothing to stop.
    fn disconnect(&self) {}
}

// ── HttpBackend ──────────────────────────────────────────────────────

/// [`Backend`] over the HTTP invoke endpoint plus an optional WebSocket
/// event channel.
pub struct HttpBackend {
    client: InvokeClient,
    events: Option<EventStream>,
    // Receivers handed out when no event channel is configured; never fires.
    idle_tx: broadcast::Sender<BackendEvent>,
}

impl HttpBackend {
    /// Command-only backend; `subscribe()` yields a silent receiver.
    pub fn new(client: InvokeClient) -> Self {
        let (idle_tx, _) = broadcast::channel(1);
        Self {
            client,
            events: None,
            idle_tx,
        }
    }

    /// Backend with a running event stream.
    pub fn with_events(client: InvokeClient, events: EventStream) -> Self {
        let (idle_tx, _) = broadcast::channel(1);
        Self {
            client,
            events: Some(events),
            idle_tx,
        }
    }

    pub fn client(&self) -> &InvokeClient {
        &self.client
    }

    pub fn has_events(&self) -> bool {
        self.events.is_some()
    }
}

impl Backend for HttpBackend {
    fn switch_dataset(&self, target: &str) -> impl Future<Output = Result<(), Error>> + Send {
        self.client.switch_dataset(target)
    }

    fn import_spreadsheet(&self, path: &Path) -> impl Future<Output = Result<(), Error>> + Send {
        self.client.import_spreadsheet(path)
    }

    fn close_database(&self) -> impl Future<Output = Result<(), Error>> + Send {
        self.client.close_database()
    }

    fn list_buildings(&self) -> impl Future<Output = Result<Vec<Building>, Error>> + Send {
        self.client.list_buildings()
    }

    fn update_building(
        &self,
        update: &BuildingUpdate,
    ) -> impl Future<Output = Result<Building, Error>> + Send {
        self.client.update_building(update)
    }

    fn select_building(&self, key: &BuildingKey) -> impl Future<Output = Result<(), Error>> + Send {
        self.client.select_building(key)
    }

    fn list_rooms(&self) -> impl Future<Output = Result<Vec<Room>, Error>> + Send {
        self.client.list_rooms()
    }

    fn update_room(&self, room: &Room) -> impl Future<Output = Result<(), Error>> + Send {
        self.client.update_room(room)
    }

    fn list_fixtures(&self) -> impl Future<Output = Result<Vec<Fixture>, Error>> + Send {
        self.client.list_fixtures()
    }

    fn insert_fixture(
        &self,
        fixture: &NewFixture,
    ) -> impl Future<Output = Result<Fixture, Error>> + Send {
        self.client.insert_fixture(fixture)
    }

    fn update_fixture(
        &self,
        update: &FixtureUpdate,
    ) -> impl Future<Output = Result<Fixture, Error>> + Send {
        self.client.update_fixture(update)
    }

    fn list_utilities(&self) -> impl Future<Output = Result<Vec<Utility>, Error>> + Send {
        self.client.list_utilities()
    }

    fn insert_utility(
        &self,
        utility: &NewUtility,
    ) -> impl Future<Output = Result<Utility, Error>> + Send {
        self.client.insert_utility(utility)
    }

    fn list_photovoltaic(&self) -> impl Future<Output = Result<Vec<PvUnit>, Error>> + Send {
        self.client.list_photovoltaic()
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        match &self.events {
            Some(stream) => stream.subscribe(),
            None => self.idle_tx.subscribe(),
        }
    }

    fn disconnect(&self) {
        if let Some(stream) = &self.events {
            stream.shutdown();
        }
    }
}
