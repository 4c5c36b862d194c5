//! Photovoltaic unit listing.

use std::sync::Arc;

use tabled::Tabled;
use survey_core::{HttpBackend, PvUnit, Session};

use crate::cli::{GlobalOpts, ScopeArgs};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::util;

#[derive(Tabled)]
struct PvRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Building")]
    building: String,
    #[tabled(rename = "kWp")]
    peak: String,
    #[tabled(rename = "Modules")]
    modules: String,
    #[tabled(rename = "Azimuth °")]
    azimuth: String,
    #[tabled(rename = "Tilt °")]
    tilt: String,
}

impl From<&Arc<PvUnit>> for PvRow {
    fn from(p: &Arc<PvUnit>) -> Self {
        Self {
            id: p.id,
            building: p.building_key.to_string(),
            peak: format!("{:.2}", p.peak_power_kwp),
            modules: or_dash(p.module_count),
            azimuth: or_dash(p.azimuth_deg),
            tilt: or_dash(p.tilt_deg),
        }
    }
}

pub async fn handle(
    session: &Session<HttpBackend>,
    scope: &ScopeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let units = util::load_scoped(session.photovoltaic(), scope).await?;
    let out = output::render_list(
        &global.output,
        &units,
        |p| PvRow::from(p),
        |p| p.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
