//! Shared helpers for command handlers.

use std::sync::Arc;

use survey_core::model::Entity;
use survey_core::{Building, BuildingKey, HttpBackend, Provider, Session};

use crate::cli::ScopeArgs;
use crate::error::CliError;

/// Fetch `provider`'s collection and return it, narrowed to `scope`'s
/// building when one was given.
pub async fn load_scoped<E: Entity>(
    provider: &Provider<E, HttpBackend>,
    scope: &ScopeArgs,
) -> Result<Vec<Arc<E>>, CliError> {
    provider.fetch_all().await?;
    Ok(match &scope.building {
        Some(key) => provider.for_building(&BuildingKey::from(key.as_str())),
        None => provider.snapshot().to_vec(),
    })
}

/// Fetch the buildings and look up `key`.
pub async fn require_building(
    session: &Session<HttpBackend>,
    key: &str,
) -> Result<Arc<Building>, CliError> {
    let key = BuildingKey::from(key);
    session.buildings().fetch_all().await?;
    session
        .buildings()
        .find(&key)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "building".into(),
            identifier: key.to_string(),
            list_command: "buildings list".into(),
        })
}

/// Print a confirmation line on stderr unless `--quiet`.
pub fn done(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}
