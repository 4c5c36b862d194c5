//! Command dispatch: bridges CLI args -> session operations -> output formatting.

pub mod buildings;
pub mod dataset;
pub mod fixtures;
pub mod pv;
pub mod rooms;
pub mod util;
pub mod utilities;
pub mod watch;

use survey_core::{HttpBackend, Session};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command against a connected session.
pub async fn dispatch(
    cmd: Command,
    session: &Session<HttpBackend>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Buildings(args) => buildings::handle(session, args, global).await,
        Command::Rooms(args) => rooms::handle(session, args, global).await,
        Command::Fixtures(args) => fixtures::handle(session, args, global).await,
        Command::Utilities(args) => utilities::handle(session, args, global).await,
        Command::Pv(args) => pv::handle(session, &args, global).await,
        Command::Switch { dataset } => dataset::switch(session, &dataset, global).await,
        Command::Select { key } => dataset::select(session, &key, global).await,
        Command::Import { path } => dataset::import(session, &path, global).await,
        Command::Watch(args) => watch::handle(session, &args, global).await,
    }
}
