//! Dataset-level commands: switch, select, import.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, warn};

use survey_core::{BuildingKey, HttpBackend, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

/// How long `switch` waits for providers when no watchdog is configured.
const DEFAULT_RELOAD_WAIT: Duration = Duration::from_secs(60);

#[derive(Serialize, Tabled)]
struct CountRow {
    #[tabled(rename = "Collection")]
    kind: String,
    #[tabled(rename = "Records")]
    records: usize,
}

// ── switch ──────────────────────────────────────────────────────────

/// Switch datasets, wait for every provider to reload, then print counts.
pub async fn switch(
    session: &Session<HttpBackend>,
    dataset: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.start().await;

    let mut phase = session.reload().watch_phase();
    session.request_switch(dataset).await?;

    let wait = session.watchdog().unwrap_or(DEFAULT_RELOAD_WAIT);
    match tokio::time::timeout(wait, phase.wait_for(|p| p.is_idle())).await {
        Ok(Ok(_)) => debug!(dataset, "reload finished"),
        Ok(Err(_)) => {
            return Err(CliError::Internal("reload coordinator went away".into()));
        }
        Err(_) => {
            let pending: Vec<String> = session
                .reload()
                .pending()
                .iter()
                .map(ToString::to_string)
                .collect();
            warn!(dataset, pending = ?pending, "reload did not finish in time");
            return Err(CliError::ReloadStalled {
                pending: pending.join(", "),
            });
        }
    }

    let rows: Vec<CountRow> = session
        .counts()
        .into_iter()
        .map(|(kind, records)| CountRow {
            kind: kind.to_string(),
            records,
        })
        .collect();
    let out = output::render_list(
        &global.output,
        &rows,
        |r| CountRow {
            kind: r.kind.clone(),
            records: r.records,
        },
        |r| format!("{}\t{}", r.kind, r.records),
    )?;
    util::done(&format!("Switched to {dataset}"), global.quiet);
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── select ──────────────────────────────────────────────────────────

pub async fn select(
    session: &Session<HttpBackend>,
    key: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.buildings().fetch_all().await?;
    let building = session.select_building(&BuildingKey::from(key)).await?;
    util::done(
        &format!("Selected {} ({})", building.key, building.name),
        global.quiet,
    );
    Ok(())
}

// ── import ──────────────────────────────────────────────────────────

pub async fn import(
    session: &Session<HttpBackend>,
    path: &Path,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !path.is_file() {
        return Err(CliError::Validation {
            reason: format!("not a file: {}", path.display()),
        });
    }
    session.import_spreadsheet(path).await?;
    util::done(
        &format!("Import of {} started; results arrive as backend events", path.display()),
        global.quiet,
    );
    Ok(())
}
