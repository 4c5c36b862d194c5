//! Window and door command handlers.

use std::sync::Arc;

use tabled::Tabled;
use survey_core::{
    Fixture, FixtureKind, FixtureUpdate, Glazing, HttpBackend, NewFixture, Session, UpdateOutcome,
};

use crate::cli::{FixtureKindArg, FixturesArgs, FixturesCommand, GlazingArg, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FixtureRow {
    #[tabled(rename = "Building")]
    building: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "W×H cm")]
    size: String,
    #[tabled(rename = "Glazing")]
    glazing: String,
    #[tabled(rename = "Material")]
    material: String,
}

impl From<&Arc<Fixture>> for FixtureRow {
    fn from(f: &Arc<Fixture>) -> Self {
        Self {
            building: f.building_key.to_string(),
            code: f.code.clone(),
            kind: format!("{:?}", f.kind),
            size: format!("{:.0}×{:.0}", f.width_cm, f.height_cm),
            glazing: format!("{:?}", f.glazing),
            material: f.material.clone().unwrap_or_default(),
        }
    }
}

fn detail(f: &Fixture) -> String {
    [
        format!("Fixture:  {}/{}", f.building_key, f.code),
        format!("Kind:     {:?}", f.kind),
        format!("Size:     {:.0} × {:.0} cm", f.width_cm, f.height_cm),
        format!("Glazing:  {:?}", f.glazing),
        format!("Material: {}", f.material.as_deref().unwrap_or("-")),
        format!(
            "Room:     {}",
            f.room_id.map_or_else(|| "-".into(), |id| id.to_string())
        ),
    ]
    .join("\n")
}

fn fixture_id(f: &Fixture) -> String {
    format!("{}/{}", f.building_key, f.code)
}

// ── Arg conversion ──────────────────────────────────────────────────

impl From<FixtureKindArg> for FixtureKind {
    fn from(arg: FixtureKindArg) -> Self {
        match arg {
            FixtureKindArg::Window => Self::Window,
            FixtureKindArg::Door => Self::Door,
        }
    }
}

impl From<GlazingArg> for Glazing {
    fn from(arg: GlazingArg) -> Self {
        match arg {
            GlazingArg::None => Self::None,
            GlazingArg::Single => Self::Single,
            GlazingArg::Double => Self::Double,
            GlazingArg::Triple => Self::Triple,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session<HttpBackend>,
    args: FixturesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FixturesCommand::List(scope) => {
            let fixtures = util::load_scoped(session.fixtures(), &scope).await?;
            let out = output::render_list(
                &global.output,
                &fixtures,
                |f| FixtureRow::from(f),
                |f| fixture_id(f),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FixturesCommand::Add {
            building,
            kind,
            width,
            height,
            glazing,
            material,
            room,
        } => {
            let building = util::require_building(session, &building).await?;
            session.fixtures().fetch_all().await?;
            let new = NewFixture {
                building_key: building.key.clone(),
                room_id: room,
                kind: kind.into(),
                width_cm: width,
                height_cm: height,
                material,
                glazing: glazing.into(),
            };
            let stored = session.fixtures().insert(&new).await?;
            let out = output::render_single(&global.output, &*stored, detail, fixture_id)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FixturesCommand::Update {
            building,
            code,
            width,
            height,
            glazing,
            material,
        } => {
            let building = util::require_building(session, &building).await?;
            session.fixtures().fetch_all().await?;
            let update = FixtureUpdate {
                building_key: building.key.clone(),
                code: code.clone(),
                width_cm: width,
                height_cm: height,
                glazing: glazing.map(Glazing::from),
                material,
                ..FixtureUpdate::default()
            };
            match session.fixtures().update(&update).await? {
                UpdateOutcome::Updated(fixture) => {
                    let out =
                        output::render_single(&global.output, &*fixture, detail, fixture_id)?;
                    output::print_output(&out, global.quiet);
                }
                UpdateOutcome::NoRowsUpdated => {
                    util::done(
                        &format!("Fixture {}/{code}: nothing was changed", building.key),
                        global.quiet,
                    );
                }
            }
            Ok(())
        }
    }
}
