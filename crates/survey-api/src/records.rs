// ── Backend record types ──
//
// Shapes exchanged with the backend process. Full records come back from
// list/insert/update commands; `New*` and `*Update` structs are request
// payloads (update payloads omit fields that should stay untouched).

use std::fmt;

use serde::{Deserialize, Serialize};

// ── BuildingKey ─────────────────────────────────────────────────────

/// Identifier of a surveyed building, assigned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingKey(String);

impl BuildingKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildingKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for BuildingKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Building ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub key: BuildingKey,
    pub name: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub year_built: Option<u16>,
    #[serde(default)]
    pub heated_area_m2: Option<f64>,
}

impl Building {
    /// Minimal record with only the key and name set.
    pub fn new(key: impl Into<BuildingKey>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            street: None,
            city: None,
            year_built: None,
            heated_area_m2: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingUpdate {
    pub key: BuildingKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heated_area_m2: Option<f64>,
}

// ── Room ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub building_key: BuildingKey,
    pub label: String,
    #[serde(default)]
    pub floor: Option<i16>,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub heating_installed: Option<bool>,
    #[serde(default)]
    pub ventilation_installed: Option<bool>,
}

// ── Fixture (windows / doors) ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    Window,
    Door,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glazing {
    None,
    Single,
    Double,
    Triple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Alphabetic code, unique within a building (e.g. `"A"`, `"AB"`).
    pub code: String,
    pub building_key: BuildingKey,
    #[serde(default)]
    pub room_id: Option<i64>,
    pub kind: FixtureKind,
    pub width_cm: f64,
    pub height_cm: f64,
    #[serde(default)]
    pub material: Option<String>,
    pub glazing: Glazing,
}

/// Insert payload; the backend assigns the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFixture {
    pub building_key: BuildingKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    pub kind: FixtureKind,
    pub width_cm: f64,
    pub height_cm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    pub glazing: Glazing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureUpdate {
    pub building_key: BuildingKey,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FixtureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glazing: Option<Glazing>,
}

// ── Utility connections ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityKind {
    Electricity,
    Gas,
    Water,
    DistrictHeating,
    Oil,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utility {
    pub id: i64,
    pub building_key: BuildingKey,
    pub kind: UtilityKind,
    #[serde(default)]
    pub meter_number: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUtility {
    pub building_key: BuildingKey,
    pub kind: UtilityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

// ── Photovoltaic ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvUnit {
    pub id: i64,
    pub building_key: BuildingKey,
    pub peak_power_kwp: f64,
    #[serde(default)]
    pub module_count: Option<u32>,
    #[serde(default)]
    pub azimuth_deg: Option<f64>,
    #[serde(default)]
    pub tilt_deg: Option<f64>,
}
