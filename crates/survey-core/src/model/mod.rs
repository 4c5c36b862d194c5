// ── Survey domain model ──
//
// Record shapes come straight from the backend boundary; this module adds
// what the state layer needs on top: entity identity (`Entity`), the
// closed set of entity kinds, and local validation of request payloads.

pub mod entity;
pub mod validation;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::reload::ParticipantId;

// ── Re-exports ──────────────────────────────────────────────────────

pub use survey_api::records::{
    Building, BuildingKey, BuildingUpdate, Fixture, FixtureKind, FixtureUpdate, Glazing,
    NewFixture, NewUtility, PvUnit, Room, Utility, UtilityKind,
};

pub use entity::{Entity, FixtureKey, Insert, Update};
pub use validation::{FieldError, Validate, ValidationErrors};

// ── EntityKind ──────────────────────────────────────────────────────

/// The entity collections the front end keeps in sync with the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Buildings,
    Rooms,
    Fixtures,
    Utilities,
    Photovoltaic,
}

impl EntityKind {
    /// Wire-style name, also used as the reload participant id.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Fixed reload participant id for this kind's provider.
    pub fn participant_id(self) -> ParticipantId {
        ParticipantId::from(self.as_str())
    }

    /// Human-readable singular, capitalized, for notifications.
    pub fn singular(self) -> &'static str {
        match self {
            Self::Buildings => "Building",
            Self::Rooms => "Room",
            Self::Fixtures => "Window or door",
            Self::Utilities => "Utility connection",
            Self::Photovoltaic => "PV unit",
        }
    }

    /// Human-readable plural for notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::Rooms => "rooms",
            Self::Fixtures => "windows and doors",
            Self::Utilities => "utility connections",
            Self::Photovoltaic => "PV units",
        }
    }
}
