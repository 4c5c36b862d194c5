// Typed backend commands
//
// One inherent method per command the backend exposes. Argument objects
// are built inline; the command names are the backend's wire identifiers.

use std::path::Path;

use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::invoke::InvokeClient;
use crate::records::{
    Building, BuildingKey, BuildingUpdate, Fixture, FixtureUpdate, NewFixture, NewUtility, PvUnit,
    Room, Utility,
};

impl InvokeClient {
    // ── Dataset ──────────────────────────────────────────────────────

    /// Switch the backend to another dataset (database file).
    pub async fn switch_dataset(&self, target: &str) -> Result<(), Error> {
        debug!(target, "switching dataset");
        self.invoke("switch_dataset", &json!({ "target": target }))
            .await
    }

    /// Import a survey spreadsheet. Results arrive as pushed events.
    pub async fn import_spreadsheet(&self, path: &Path) -> Result<(), Error> {
        self.invoke(
            "import_spreadsheet",
            &json!({ "path": path.to_string_lossy() }),
        )
        .await
    }

    /// Ask the backend to close its storage.
    pub async fn close_database(&self) -> Result<(), Error> {
        self.invoke("close_database", &json!({})).await
    }

    // ── Buildings ────────────────────────────────────────────────────

    pub async fn list_buildings(&self) -> Result<Vec<Building>, Error> {
        self.invoke("list_buildings", &json!({})).await
    }

    pub async fn update_building(&self, update: &BuildingUpdate) -> Result<Building, Error> {
        self.invoke("update_building", &json!({ "building": update }))
            .await
    }

    /// Persist the active building selection.
    pub async fn select_building(&self, key: &BuildingKey) -> Result<(), Error> {
        self.invoke("select_building", &json!({ "key": key })).await
    }

    // ── Rooms ────────────────────────────────────────────────────────

    pub async fn list_rooms(&self) -> Result<Vec<Room>, Error> {
        self.invoke("list_rooms", &json!({})).await
    }

    /// Full-record room update. Fails with [`Error::NoRowsUpdated`] when
    /// the room id is unknown to the backend.
    pub async fn update_room(&self, room: &Room) -> Result<(), Error> {
        self.invoke("update_room", &json!({ "room": room })).await
    }

    // ── Fixtures ─────────────────────────────────────────────────────

    pub async fn list_fixtures(&self) -> Result<Vec<Fixture>, Error> {
        self.invoke("list_fixtures", &json!({})).await
    }

    pub async fn insert_fixture(&self, fixture: &NewFixture) -> Result<Fixture, Error> {
        self.invoke("insert_fixture", &json!({ "fixture": fixture }))
            .await
    }

    pub async fn update_fixture(&self, update: &FixtureUpdate) -> Result<Fixture, Error> {
        self.invoke("update_fixture", &json!({ "fixture": update }))
            .await
    }

    // ── Utilities ────────────────────────────────────────────────────

    pub async fn list_utilities(&self) -> Result<Vec<Utility>, Error> {
        self.invoke("list_utilities", &json!({})).await
    }

    pub async fn insert_utility(&self, utility: &NewUtility) -> Result<Utility, Error> {
        self.invoke("insert_utility", &json!({ "utility": utility }))
            .await
    }

    // ── Photovoltaic ─────────────────────────────────────────────────

    pub async fn list_photovoltaic(&self) -> Result<Vec<PvUnit>, Error> {
        self.invoke("list_photovoltaic", &json!({})).await
    }
}
