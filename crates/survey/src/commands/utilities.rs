//! Utility connection command handlers.

use std::sync::Arc;

use tabled::Tabled;
use survey_core::{HttpBackend, NewUtility, Session, Utility, UtilityKind};

use crate::cli::{GlobalOpts, UtilitiesArgs, UtilitiesCommand, UtilityKindArg};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct UtilityRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Building")]
    building: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Meter")]
    meter: String,
    #[tabled(rename = "Supplier")]
    supplier: String,
}

impl From<&Arc<Utility>> for UtilityRow {
    fn from(u: &Arc<Utility>) -> Self {
        Self {
            id: u.id,
            building: u.building_key.to_string(),
            kind: format!("{:?}", u.kind),
            meter: u.meter_number.clone().unwrap_or_default(),
            supplier: u.supplier.clone().unwrap_or_default(),
        }
    }
}

fn detail(u: &Utility) -> String {
    [
        format!("ID:       {}", u.id),
        format!("Building: {}", u.building_key),
        format!("Kind:     {:?}", u.kind),
        format!("Meter:    {}", u.meter_number.as_deref().unwrap_or("-")),
        format!("Supplier: {}", u.supplier.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

impl From<UtilityKindArg> for UtilityKind {
    fn from(arg: UtilityKindArg) -> Self {
        match arg {
            UtilityKindArg::Electricity => Self::Electricity,
            UtilityKindArg::Gas => Self::Gas,
            UtilityKindArg::Water => Self::Water,
            UtilityKindArg::DistrictHeating => Self::DistrictHeating,
            UtilityKindArg::Oil => Self::Oil,
        }
    }
}

pub async fn handle(
    session: &Session<HttpBackend>,
    args: UtilitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UtilitiesCommand::List(scope) => {
            let utilities = util::load_scoped(session.utilities(), &scope).await?;
            let out = output::render_list(
                &global.output,
                &utilities,
                |u| UtilityRow::from(u),
                |u| u.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        UtilitiesCommand::Add {
            building,
            kind,
            meter,
            supplier,
        } => {
            let building = util::require_building(session, &building).await?;
            session.utilities().fetch_all().await?;
            let new = NewUtility {
                building_key: building.key.clone(),
                kind: kind.into(),
                meter_number: meter,
                supplier,
            };
            let stored = session.utilities().insert(&new).await?;
            let out = output::render_single(&global.output, &*stored, detail, |u| u.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
