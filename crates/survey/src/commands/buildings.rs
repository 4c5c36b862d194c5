//! Building command handlers.

use std::sync::Arc;

use tabled::Tabled;
use survey_core::{Building, BuildingKey, BuildingUpdate, HttpBackend, Session, UpdateOutcome};

use crate::cli::{BuildingsArgs, BuildingsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BuildingRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Built")]
    year_built: String,
    #[tabled(rename = "Heated m²")]
    heated_area: String,
}

impl From<&Arc<Building>> for BuildingRow {
    fn from(b: &Arc<Building>) -> Self {
        Self {
            key: b.key.to_string(),
            name: b.name.clone(),
            city: b.city.clone().unwrap_or_default(),
            year_built: or_dash(b.year_built),
            heated_area: b
                .heated_area_m2
                .map_or_else(|| "-".into(), |a| format!("{a:.1}")),
        }
    }
}

fn detail(b: &Arc<Building>) -> String {
    [
        format!("Key:        {}", b.key),
        format!("Name:       {}", b.name),
        format!("Street:     {}", b.street.as_deref().unwrap_or("-")),
        format!("City:       {}", b.city.as_deref().unwrap_or("-")),
        format!("Built:      {}", or_dash(b.year_built)),
        format!(
            "Heated:     {}",
            b.heated_area_m2
                .map_or_else(|| "-".into(), |a| format!("{a:.1} m²"))
        ),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session<HttpBackend>,
    args: BuildingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        BuildingsCommand::List => {
            session.buildings().fetch_all().await?;
            let snap = session.buildings().snapshot();
            let out = output::render_list(
                &global.output,
                &snap,
                |b| BuildingRow::from(b),
                |b| b.key.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BuildingsCommand::Get { key } => {
            let building = util::require_building(session, &key).await?;
            let out =
                output::render_single(&global.output, &building, detail, |b| b.key.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BuildingsCommand::Update {
            key,
            name,
            street,
            city,
            year_built,
            heated_area,
        } => {
            let key = util::require_building(session, &key).await?.key.clone();
            let update = BuildingUpdate {
                key: key.clone(),
                name,
                street,
                city,
                year_built,
                heated_area_m2: heated_area,
            };
            report(session.buildings().update(&update).await?, &key, global)
        }
    }
}

fn report(
    outcome: UpdateOutcome<Building>,
    key: &BuildingKey,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match outcome {
        UpdateOutcome::Updated(building) => {
            let out =
                output::render_single(&global.output, &building, detail, |b| b.key.to_string())?;
            output::print_output(&out, global.quiet);
        }
        UpdateOutcome::NoRowsUpdated => {
            util::done(&format!("Building {key}: nothing was changed"), global.quiet);
        }
    }
    Ok(())
}
