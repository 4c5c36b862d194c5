//! Room command handlers.

use std::sync::Arc;

use tabled::Tabled;
use survey_core::{HttpBackend, Room, Session, UpdateOutcome};

use crate::cli::{GlobalOpts, RoomsArgs, RoomsCommand};
use crate::error::CliError;
use crate::output::{self, or_dash};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RoomRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Building")]
    building: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Floor")]
    floor: String,
    #[tabled(rename = "Area m²")]
    area: String,
    #[tabled(rename = "Height m")]
    height: String,
    #[tabled(rename = "Heating")]
    heating: String,
}

impl From<&Arc<Room>> for RoomRow {
    fn from(r: &Arc<Room>) -> Self {
        Self {
            id: r.id,
            building: r.building_key.to_string(),
            label: r.label.clone(),
            floor: or_dash(r.floor),
            area: r.area_m2.map_or_else(|| "-".into(), |a| format!("{a:.1}")),
            height: r.height_m.map_or_else(|| "-".into(), |h| format!("{h:.2}")),
            heating: or_dash(r.heating_installed.map(yes_no)),
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn detail(r: &Room) -> String {
    [
        format!("ID:          {}", r.id),
        format!("Building:    {}", r.building_key),
        format!("Label:       {}", r.label),
        format!("Floor:       {}", or_dash(r.floor)),
        format!("Area:        {}", or_dash(r.area_m2)),
        format!("Height:      {}", or_dash(r.height_m)),
        format!("Heating:     {}", or_dash(r.heating_installed.map(yes_no))),
        format!("Ventilation: {}", or_dash(r.ventilation_installed.map(yes_no))),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session<HttpBackend>,
    args: RoomsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RoomsCommand::List(scope) => {
            let rooms = util::load_scoped(session.rooms(), &scope).await?;
            let out = output::render_list(
                &global.output,
                &rooms,
                |r| RoomRow::from(r),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RoomsCommand::Update {
            id,
            label,
            floor,
            area,
            height,
            heating,
            ventilation,
        } => {
            session.rooms().fetch_all().await?;
            let current = session.rooms().find(&id).ok_or_else(|| CliError::NotFound {
                resource_type: "room".into(),
                identifier: id.to_string(),
                list_command: "rooms list".into(),
            })?;

            // Rooms are updated as whole records.
            let mut room = Room::clone(&current);
            if let Some(label) = label {
                room.label = label;
            }
            room.floor = floor.or(room.floor);
            room.area_m2 = area.or(room.area_m2);
            room.height_m = height.or(room.height_m);
            room.heating_installed = heating.or(room.heating_installed);
            room.ventilation_installed = ventilation.or(room.ventilation_installed);

            match session.rooms().update(&room).await? {
                UpdateOutcome::Updated(room) => {
                    let out = output::render_single(&global.output, &*room, detail, |r| {
                        r.id.to_string()
                    })?;
                    output::print_output(&out, global.quiet);
                }
                UpdateOutcome::NoRowsUpdated => {
                    util::done(&format!("Room {id}: nothing was changed"), global.quiet);
                }
            }
            Ok(())
        }
    }
}
