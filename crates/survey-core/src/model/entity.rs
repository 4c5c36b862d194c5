// ── Entity identity and backend dispatch ──
//
// `Entity` ties a record type to its key, its kind, the building it
// belongs to, and the backend command that lists it. `Insert` and
// `Update` add the mutation commands for the kinds that have them.

use std::fmt;
use std::future::Future;

use survey_api::Backend;

use super::validation::Validate;
use super::{
    Building, BuildingKey, BuildingUpdate, EntityKind, Fixture, FixtureUpdate, NewFixture,
    NewUtility, PvUnit, Room, Utility,
};

/// A record held in a provider's collection.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Domain identifier, unique within the collection.
    type Key: Clone + PartialEq + fmt::Debug + Send + Sync;

    const KIND: EntityKind;

    fn key(&self) -> Self::Key;

    /// The building this record belongs to (a building's own key for
    /// buildings).
    fn building_key(&self) -> &BuildingKey;

    /// Fetch the full collection from the backend.
    fn list<B: Backend>(
        backend: &B,
    ) -> impl Future<Output = Result<Vec<Self>, survey_api::Error>> + Send;
}

/// Kinds the backend can create. The backend assigns identifiers and
/// returns the stored record.
pub trait Insert: Entity {
    type New: Validate + fmt::Debug + Send + Sync;

    fn insert<B: Backend>(
        backend: &B,
        new: &Self::New,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send;
}

/// Kinds the backend can update. The returned record is authoritative.
pub trait Update: Entity {
    type Patch: Validate + fmt::Debug + Send + Sync;

    /// Key of the record the patch targets.
    fn patch_key(patch: &Self::Patch) -> Self::Key;

    fn update<B: Backend>(
        backend: &B,
        patch: &Self::Patch,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send;
}

// ── Buildings ────────────────────────────────────────────────────────

impl Entity for Building {
    type Key = BuildingKey;
    const KIND: EntityKind = EntityKind::Buildings;

    fn key(&self) -> BuildingKey {
        self.key.clone()
    }

    fn building_key(&self) -> &BuildingKey {
        &self.key
    }

    fn list<B: Backend>(
        backend: &B,
    ) -> impl Future<Output = Result<Vec<Self>, survey_api::Error>> + Send {
        backend.list_buildings()
    }
}

impl Update for Building {
    type Patch = BuildingUpdate;

    fn patch_key(patch: &BuildingUpdate) -> BuildingKey {
        patch.key.clone()
    }

    fn update<B: Backend>(
        backend: &B,
        patch: &BuildingUpdate,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send {
        backend.update_building(patch)
    }
}

// ── Rooms ────────────────────────────────────────────────────────────

impl Entity for Room {
    type Key = i64;
    const KIND: EntityKind = EntityKind::Rooms;

    fn key(&self) -> i64 {
        self.id
    }

    fn building_key(&self) -> &BuildingKey {
        &self.building_key
    }

    fn list<B: Backend>(
        backend: &B,
    ) -> impl Future<Output = Result<Vec<Self>, survey_api::Error>> + Send {
        backend.list_rooms()
    }
}

/// Rooms are updated as full records; the backend confirms without
/// echoing, so the sent record becomes the local value.
impl Update for Room {
    type Patch = Room;

    fn patch_key(patch: &Room) -> i64 {
        patch.id
    }

    fn update<B: Backend>(
        backend: &B,
        patch: &Room,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send {
        async move {
            backend.update_room(patch).await?;
            Ok(patch.clone())
        }
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

/// Fixture codes are only unique within a building.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixtureKey {
    pub building_key: BuildingKey,
    pub code: String,
}

impl fmt::Display for FixtureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.building_key, self.code)
    }
}

impl Entity for Fixture {
    type Key = FixtureKey;
    const KIND: EntityKind = EntityKind::Fixtures;

    fn key(&self) -> FixtureKey {
        FixtureKey {
            building_key: self.building_key.clone(),
            code: self.code.clone(),
        }
    }

    fn building_key(&self) -> &BuildingKey {
        &self.building_key
    }

    fn list<B: Backend>(
        backend: &B,
    ) -> impl Future<Output = Result<Vec<Self>, survey_api::Error>> + Send {
        backend.list_fixtures()
    }
}

impl Insert for Fixture {
    type New = NewFixture;

    fn insert<B: Backend>(
        backend: &B,
        new: &NewFixture,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send {
        backend.insert_fixture(new)
    }
}

impl Update for Fixture {
    type Patch = FixtureUpdate;

    fn patch_key(patch: &FixtureUpdate) -> FixtureKey {
        FixtureKey {
            building_key: patch.building_key.clone(),
            code: patch.code.clone(),
        }
    }

    fn update<B: Backend>(
        backend: &B,
        patch: &FixtureUpdate,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send {
        backend.update_fixture(patch)
    }
}

// ── Utilities ────────────────────────────────────────────────────────

impl Entity for Utility {
    type Key = i64;
    const KIND: EntityKind = EntityKind::Utilities;

    fn key(&self) -> i64 {
        self.id
    }

    fn building_key(&self) -> &BuildingKey {
        &self.building_key
    }

    fn list<B: Backend>(
        backend: &B,
    ) -> impl Future<Output = Result<Vec<Self>, survey_api::Error>> + Send {
        backend.list_utilities()
    }
}

impl Insert for Utility {
    type New = NewUtility;

    fn insert<B: Backend>(
        backend: &B,
        new: &NewUtility,
    ) -> impl Future<Output = Result<Self, survey_api::Error>> + Send {
        backend.insert_utility(new)
    }
}

// ── Photovoltaic ─────────────────────────────────────────────────────

impl Entity for PvUnit {
    type Key = i64;
    const KIND: EntityKind = EntityKind::Photovoltaic;

    fn key(&self) -> i64 {
        self.id
    }

    fn building_key(&self) -> &BuildingKey {
        &self.building_key
    }

    fn list<B: Backend>(
        backend: &B,
    ) -> impl Future<Output = Result<Vec<Self>, survey_api::Error>> + Send {
        backend.list_photovoltaic()
    }
}
