// ── Local payload validation ──
//
// Range and presence checks run before a payload is sent to the backend.
// Failures are keyed by field so a form can show them next to the input;
// they are never posted to the notification channel.

use std::fmt;

use super::{BuildingUpdate, FixtureUpdate, NewFixture, NewUtility, Room};

const FIXTURE_DIMENSION_CM: (f64, f64) = (10.0, 1000.0);
const ROOM_AREA_M2: (f64, f64) = (0.5, 10_000.0);
const ROOM_HEIGHT_M: (f64, f64) = (1.0, 20.0);
const ROOM_FLOOR: (i16, i16) = (-5, 150);
const BUILDING_YEAR: (u16, u16) = (1000, 2100);
const BUILDING_AREA_M2: (f64, f64) = (1.0, 1_000_000.0);
const MATERIAL_MAX_LEN: usize = 64;
const METER_NUMBER_MAX_LEN: usize = 32;
const SUPPLIER_MAX_LEN: usize = 120;

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All failed checks for one payload, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// First message recorded for `field`.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    // ── Checks ───────────────────────────────────────────────────────

    fn range_f64(&mut self, field: &'static str, value: f64, (min, max): (f64, f64), unit: &str) {
        if !value.is_finite() || value < min || value > max {
            self.push(field, format!("must be between {min} and {max} {unit}"));
        }
    }

    fn range_opt_f64(
        &mut self,
        field: &'static str,
        value: Option<f64>,
        bounds: (f64, f64),
        unit: &str,
    ) {
        if let Some(v) = value {
            self.range_f64(field, v, bounds, unit);
        }
    }

    fn text(&mut self, field: &'static str, value: Option<&str>, max_len: usize) {
        let Some(v) = value else { return };
        if v.trim().is_empty() {
            self.push(field, "must not be blank");
        } else if v.chars().count() > max_len {
            self.push(field, format!("must be at most {max_len} characters"));
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Local checks for a request payload.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

// ── Implementations ─────────────────────────────────────────────────

impl Validate for NewFixture {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.range_f64("width_cm", self.width_cm, FIXTURE_DIMENSION_CM, "cm");
        errors.range_f64("height_cm", self.height_cm, FIXTURE_DIMENSION_CM, "cm");
        errors.text("material", self.material.as_deref(), MATERIAL_MAX_LEN);
        errors.into_result()
    }
}

impl Validate for FixtureUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.code.trim().is_empty() {
            errors.push("code", "must not be blank");
        }
        errors.range_opt_f64("width_cm", self.width_cm, FIXTURE_DIMENSION_CM, "cm");
        errors.range_opt_f64("height_cm", self.height_cm, FIXTURE_DIMENSION_CM, "cm");
        errors.text("material", self.material.as_deref(), MATERIAL_MAX_LEN);
        errors.into_result()
    }
}

impl Validate for Room {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.label.trim().is_empty() {
            errors.push("label", "must not be blank");
        }
        if let Some(floor) = self.floor {
            let (min, max) = ROOM_FLOOR;
            if !(min..=max).contains(&floor) {
                errors.push("floor", format!("must be between {min} and {max}"));
            }
        }
        errors.range_opt_f64("area_m2", self.area_m2, ROOM_AREA_M2, "m²");
        errors.range_opt_f64("height_m", self.height_m, ROOM_HEIGHT_M, "m");
        errors.into_result()
    }
}

impl Validate for NewUtility {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.text(
            "meter_number",
            self.meter_number.as_deref(),
            METER_NUMBER_MAX_LEN,
        );
        errors.text("supplier", self.supplier.as_deref(), SUPPLIER_MAX_LEN);
        errors.into_result()
    }
}

impl Validate for BuildingUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.push("name", "must not be blank");
        }
        if let Some(year) = self.year_built {
            let (min, max) = BUILDING_YEAR;
            if !(min..=max).contains(&year) {
                errors.push("year_built", format!("must be between {min} and {max}"));
            }
        }
        errors.range_opt_f64("heated_area_m2", self.heated_area_m2, BUILDING_AREA_M2, "m²");
        errors.into_result()
    }
}
