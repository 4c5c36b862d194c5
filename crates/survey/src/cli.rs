//! Clap derive structures for the `survey` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// survey -- console front end for the building survey desk
#[derive(Debug, Parser)]
#[command(
    name = "survey",
    version,
    about = "Inspect and edit building survey data from the command line",
    long_about = "Talks to a running survey backend: lists buildings, rooms, windows and \
        doors, utility connections and PV units, switches datasets, and streams \
        backend notifications.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "SURVEY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend command endpoint (overrides profile)
    #[arg(long, short = 'b', env = "SURVEY_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Backend event endpoint (overrides profile; derived from --backend otherwise)
    #[arg(long, env = "SURVEY_EVENTS", global = true)]
    pub events: Option<String>,

    /// Session token
    #[arg(long, env = "SURVEY_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SURVEY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SURVEY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "SURVEY_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and edit surveyed buildings
    #[command(alias = "b")]
    Buildings(BuildingsArgs),

    /// List and edit rooms
    #[command(alias = "r")]
    Rooms(RoomsArgs),

    /// List, add and edit windows and doors
    #[command(alias = "fx")]
    Fixtures(FixturesArgs),

    /// List and add utility connections
    #[command(alias = "u")]
    Utilities(UtilitiesArgs),

    /// List photovoltaic units
    Pv(ScopeArgs),

    /// Switch the backend to another dataset and wait for the reload
    Switch {
        /// Dataset (database file) to open
        dataset: String,
    },

    /// Make a building the active one
    Select {
        /// Building key
        key: String,
    },

    /// Import a survey spreadsheet into the current dataset
    Import {
        /// Spreadsheet path
        path: PathBuf,
    },

    /// Stay connected and stream notifications and reload progress
    Watch(WatchArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Narrow a listing to one building.
#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Only records of this building
    #[arg(long, short = 'B')]
    pub building: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BUILDINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BuildingsArgs {
    #[command(subcommand)]
    pub command: BuildingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BuildingsCommand {
    /// List buildings
    #[command(alias = "ls")]
    List,

    /// Show one building
    Get {
        /// Building key
        key: String,
    },

    /// Update building fields
    Update {
        /// Building key
        key: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        street: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// Year of construction
        #[arg(long)]
        year_built: Option<u16>,

        /// Heated floor area in m²
        #[arg(long)]
        heated_area: Option<f64>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROOMS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RoomsArgs {
    #[command(subcommand)]
    pub command: RoomsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoomsCommand {
    /// List rooms
    #[command(alias = "ls")]
    List(ScopeArgs),

    /// Edit a room (unspecified fields keep their current values)
    Update {
        /// Room ID
        id: i64,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        floor: Option<i16>,

        /// Floor area in m²
        #[arg(long)]
        area: Option<f64>,

        /// Clear height in m
        #[arg(long)]
        height: Option<f64>,

        #[arg(long)]
        heating: Option<bool>,

        #[arg(long)]
        ventilation: Option<bool>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FIXTURES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FixturesArgs {
    #[command(subcommand)]
    pub command: FixturesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FixturesCommand {
    /// List windows and doors
    #[command(alias = "ls")]
    List(ScopeArgs),

    /// Record a new window or door
    Add {
        /// Building key
        #[arg(long, short = 'B')]
        building: String,

        #[arg(long, value_enum, default_value = "window")]
        kind: FixtureKindArg,

        /// Width in cm
        #[arg(long)]
        width: f64,

        /// Height in cm
        #[arg(long)]
        height: f64,

        #[arg(long, value_enum, default_value = "double")]
        glazing: GlazingArg,

        #[arg(long)]
        material: Option<String>,

        /// Room the fixture belongs to
        #[arg(long)]
        room: Option<i64>,
    },

    /// Edit a window or door
    Update {
        /// Building key
        #[arg(long, short = 'B')]
        building: String,

        /// Fixture code (e.g. "A")
        code: String,

        /// Width in cm
        #[arg(long)]
        width: Option<f64>,

        /// Height in cm
        #[arg(long)]
        height: Option<f64>,

        #[arg(long, value_enum)]
        glazing: Option<GlazingArg>,

        #[arg(long)]
        material: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FixtureKindArg {
    Window,
    Door,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GlazingArg {
    None,
    Single,
    Double,
    Triple,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UtilitiesArgs {
    #[command(subcommand)]
    pub command: UtilitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum UtilitiesCommand {
    /// List utility connections
    #[command(alias = "ls")]
    List(ScopeArgs),

    /// Record a new utility connection
    Add {
        /// Building key
        #[arg(long, short = 'B')]
        building: String,

        #[arg(long, value_enum)]
        kind: UtilityKindArg,

        #[arg(long)]
        meter: Option<String>,

        #[arg(long)]
        supplier: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UtilityKindArg {
    Electricity,
    Gas,
    Water,
    DistrictHeating,
    Oil,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Also print reload start/finish lines
    #[arg(long)]
    pub reloads: bool,

    /// Give up on a reload that stalls instead of waiting for Ctrl-C
    #[arg(long)]
    pub abandon_stalled: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "survey",
            "rooms",
            "list",
            "--building",
            "B1",
            "-o",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.global.output, OutputFormat::Json));
        let Command::Rooms(RoomsArgs {
            command: RoomsCommand::List(scope),
        }) = cli.command
        else {
            panic!("expected rooms list");
        };
        assert_eq!(scope.building.as_deref(), Some("B1"));
    }

    #[test]
    fn fixture_add_defaults() {
        let cli = Cli::try_parse_from([
            "survey", "fixtures", "add", "-B", "B1", "--width", "120", "--height", "140",
        ])
        .unwrap();

        let Command::Fixtures(FixturesArgs {
            command: FixturesCommand::Add { kind, glazing, .. },
        }) = cli.command
        else {
            panic!("expected fixtures add");
        };
        assert!(matches!(kind, FixtureKindArg::Window));
        assert!(matches!(glazing, GlazingArg::Double));
    }

    #[test]
    fn switch_requires_dataset() {
        assert!(Cli::try_parse_from(["survey", "switch"]).is_err());
    }
}
