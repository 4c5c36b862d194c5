// Scripted in-memory backend shared by the survey-core integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, broadcast};

use survey_api::{Backend, BackendEvent, Error};
use survey_core::{
    Building, BuildingKey, BuildingUpdate, Fixture, FixtureKind, FixtureUpdate, Glazing,
    NewFixture, NewUtility, Notification, NotificationKind, PvUnit, Room, Utility, UtilityKind,
};

// ── Script ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    dataset: Option<String>,
    selected: Option<BuildingKey>,
    buildings: Vec<Building>,
    rooms: Vec<Room>,
    fixtures: Vec<Fixture>,
    utilities: Vec<Utility>,
    photovoltaic: Vec<PvUnit>,
    failing: HashSet<&'static str>,
    no_rows: HashSet<&'static str>,
    gates: HashMap<&'static str, Arc<Semaphore>>,
    calls: Vec<&'static str>,
    next_id: i64,
}

/// In-memory `Backend` whose data, failures and timing are set by the test.
pub struct ScriptedBackend {
    script: Mutex<Script>,
    events: broadcast::Sender<BackendEvent>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            script: Mutex::new(Script {
                next_id: 100,
                ..Script::default()
            }),
            events,
        }
    }

    pub fn with_buildings(self, buildings: Vec<Building>) -> Self {
        self.script.lock().unwrap().buildings = buildings;
        self
    }

    pub fn with_rooms(self, rooms: Vec<Room>) -> Self {
        self.script.lock().unwrap().rooms = rooms;
        self
    }

    pub fn with_fixtures(self, fixtures: Vec<Fixture>) -> Self {
        self.script.lock().unwrap().fixtures = fixtures;
        self
    }

    pub fn with_utilities(self, utilities: Vec<Utility>) -> Self {
        self.script.lock().unwrap().utilities = utilities;
        self
    }

    pub fn set_buildings(&self, buildings: Vec<Building>) {
        self.script.lock().unwrap().buildings = buildings;
    }

    /// Make every following call of `command` fail.
    pub fn fail(&self, command: &'static str) {
        self.script.lock().unwrap().failing.insert(command);
    }

    pub fn recover(&self, command: &'static str) {
        self.script.lock().unwrap().failing.remove(command);
    }

    /// Make `command` report that it matched nothing.
    pub fn no_rows(&self, command: &'static str) {
        self.script.lock().unwrap().no_rows.insert(command);
    }

    /// Hold every call of `command` until the test adds permits to the
    /// returned semaphore (one permit releases one call).
    pub fn gate(&self, command: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.script
            .lock()
            .unwrap()
            .gates
            .insert(command, Arc::clone(&gate));
        gate
    }

    pub fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self, command: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == command)
            .count()
    }

    pub fn dataset(&self) -> Option<String> {
        self.script.lock().unwrap().dataset.clone()
    }

    pub fn selected(&self) -> Option<BuildingKey> {
        self.script.lock().unwrap().selected.clone()
    }

    async fn enter(&self, command: &'static str) -> Result<(), Error> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(command);
            script.gates.get(command).cloned()
        };
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let script = self.script.lock().unwrap();
        if script.failing.contains(command) {
            return Err(Error::Command {
                command: command.into(),
                message: "scripted failure".into(),
            });
        }
        if script.no_rows.contains(command) {
            return Err(Error::NoRowsUpdated {
                command: command.into(),
            });
        }
        Ok(())
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        f(&mut self.script.lock().unwrap())
    }
}

impl Backend for ScriptedBackend {
    async fn switch_dataset(&self, target: &str) -> Result<(), Error> {
        self.enter("switch_dataset").await?;
        let target = target.to_owned();
        self.with_script(|s| s.dataset = Some(target));
        Ok(())
    }

    async fn import_spreadsheet(&self, _path: &Path) -> Result<(), Error> {
        self.enter("import_spreadsheet").await
    }

    async fn close_database(&self) -> Result<(), Error> {
        self.enter("close_database").await
    }

    async fn list_buildings(&self) -> Result<Vec<Building>, Error> {
        self.enter("list_buildings").await?;
        Ok(self.with_script(|s| s.buildings.clone()))
    }

    async fn update_building(&self, update: &BuildingUpdate) -> Result<Building, Error> {
        self.enter("update_building").await?;
        let update = update.clone();
        self.with_script(|s| {
            let stored = s
                .buildings
                .iter_mut()
                .find(|b| b.key == update.key)
                .ok_or_else(|| Error::NoRowsUpdated {
                    command: "update_building".into(),
                })?;
            if let Some(name) = update.name {
                stored.name = name;
            }
            if let Some(city) = update.city {
                stored.city = Some(city);
            }
            if let Some(year) = update.year_built {
                stored.year_built = Some(year);
            }
            Ok(stored.clone())
        })
    }

    async fn select_building(&self, key: &BuildingKey) -> Result<(), Error> {
        self.enter("select_building").await?;
        let key = key.clone();
        self.with_script(|s| s.selected = Some(key));
        Ok(())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, Error> {
        self.enter("list_rooms").await?;
        Ok(self.with_script(|s| s.rooms.clone()))
    }

    async fn update_room(&self, room: &Room) -> Result<(), Error> {
        self.enter("update_room").await?;
        let room = room.clone();
        self.with_script(|s| {
            if let Some(stored) = s.rooms.iter_mut().find(|r| r.id == room.id) {
                *stored = room;
            }
        });
        Ok(())
    }

    async fn list_fixtures(&self) -> Result<Vec<Fixture>, Error> {
        self.enter("list_fixtures").await?;
        Ok(self.with_script(|s| s.fixtures.clone()))
    }

    async fn insert_fixture(&self, fixture: &NewFixture) -> Result<Fixture, Error> {
        self.enter("insert_fixture").await?;
        let new = fixture.clone();
        Ok(self.with_script(|s| {
            let taken = s
                .fixtures
                .iter()
                .filter(|f| f.building_key == new.building_key)
                .count();
            let code = char::from(b'A' + u8::try_from(taken % 26).unwrap()).to_string();
            let stored = Fixture {
                code,
                building_key: new.building_key,
                room_id: new.room_id,
                kind: new.kind,
                width_cm: new.width_cm,
                height_cm: new.height_cm,
                material: new.material,
                glazing: new.glazing,
            };
            s.fixtures.push(stored.clone());
            stored
        }))
    }

    async fn update_fixture(&self, update: &FixtureUpdate) -> Result<Fixture, Error> {
        self.enter("update_fixture").await?;
        let update = update.clone();
        self.with_script(|s| {
            let stored = s
                .fixtures
                .iter_mut()
                .find(|f| f.building_key == update.building_key && f.code == update.code)
                .ok_or_else(|| Error::NoRowsUpdated {
                    command: "update_fixture".into(),
                })?;
            if let Some(width) = update.width_cm {
                stored.width_cm = width;
            }
            if let Some(height) = update.height_cm {
                stored.height_cm = height;
            }
            if let Some(material) = update.material {
                stored.material = Some(material);
            }
            if let Some(glazing) = update.glazing {
                stored.glazing = glazing;
            }
            Ok(stored.clone())
        })
    }

    async fn list_utilities(&self) -> Result<Vec<Utility>, Error> {
        self.enter("list_utilities").await?;
        Ok(self.with_script(|s| s.utilities.clone()))
    }

    async fn insert_utility(&self, utility: &NewUtility) -> Result<Utility, Error> {
        self.enter("insert_utility").await?;
        let new = utility.clone();
        Ok(self.with_script(|s| {
            s.next_id += 1;
            let stored = Utility {
                id: s.next_id,
                building_key: new.building_key,
                kind: new.kind,
                meter_number: new.meter_number,
                supplier: new.supplier,
            };
            s.utilities.push(stored.clone());
            stored
        }))
    }

    async fn list_photovoltaic(&self) -> Result<Vec<PvUnit>, Error> {
        self.enter("list_photovoltaic").await?;
        Ok(self.with_script(|s| s.photovoltaic.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }
}

// ── Record builders ─────────────────────────────────────────────────

pub fn building(key: &str) -> Building {
    Building::new(key, format!("Building {key}"))
}

pub fn room(id: i64, building_key: &str, label: &str) -> Room {
    Room {
        id,
        building_key: building_key.into(),
        label: label.into(),
        floor: Some(0),
        area_m2: Some(20.0),
        height_m: Some(2.5),
        heating_installed: Some(true),
        ventilation_installed: None,
    }
}

pub fn window(building_key: &str, code: &str, width_cm: f64, height_cm: f64) -> Fixture {
    Fixture {
        code: code.into(),
        building_key: building_key.into(),
        room_id: None,
        kind: FixtureKind::Window,
        width_cm,
        height_cm,
        material: Some("wood".into()),
        glazing: Glazing::Double,
    }
}

pub fn gas_connection(id: i64, building_key: &str) -> Utility {
    Utility {
        id,
        building_key: building_key.into(),
        kind: UtilityKind::Gas,
        meter_number: Some("G-1".into()),
        supplier: None,
    }
}

// ── Assertions ──────────────────────────────────────────────────────

pub fn of_kind(queue: &[Notification], kind: NotificationKind) -> Vec<String> {
    queue
        .iter()
        .filter(|n| n.kind == kind)
        .map(|n| n.message.clone())
        .collect()
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
