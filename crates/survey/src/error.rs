//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use survey_config::ConfigError;
use survey_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the survey backend at {url}")]
    #[diagnostic(
        code(survey::connection_failed),
        help(
            "Check that the backend process is running.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend rejected the session token")]
    #[diagnostic(
        code(survey::auth_failed),
        help(
            "Set the token with --token or SURVEY_TOKEN, or store it in the keyring\n\
             under service 'survey', entry '<profile>/token'."
        )
    )]
    AuthFailed,

    // ── Backend ──────────────────────────────────────────────────────

    #[error("{operation} failed: {message}")]
    #[diagnostic(code(survey::backend))]
    Backend { operation: String, message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(survey::not_found),
        help("Run: survey {list_command} to see what is loaded")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Backend and local data disagree: {message}")]
    #[diagnostic(
        code(survey::consistency),
        help("The backend sent something this client does not know. Reload the dataset.")
    )]
    Consistency { message: String },

    // ── Coordination ─────────────────────────────────────────────────

    #[error("A dataset switch is already in progress")]
    #[diagnostic(code(survey::switch_in_flight), help("Wait for it to finish and retry."))]
    SwitchInFlight,

    #[error("Reload did not finish; still waiting for: {pending}")]
    #[diagnostic(
        code(survey::reload_stalled),
        help("A data source never reported back. Check the backend log.")
    )]
    ReloadStalled { pending: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid input: {reason}")]
    #[diagnostic(code(survey::validation))]
    Validation { reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No backend configured")]
    #[diagnostic(
        code(survey::no_config),
        help(
            "Pass --backend http://127.0.0.1:1420, or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(survey::config))]
    Config(#[from] ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(survey::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(survey::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(survey::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::SwitchInFlight => exit_code::CONFLICT,
            Self::Timeout { .. } | Self::ReloadStalled { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Unauthorized => CliError::AuthFailed,

            CoreError::Backend { operation, message } => CliError::Backend { operation, message },

            CoreError::NoRowsUpdated { operation } => CliError::Backend {
                message: "nothing was changed".into(),
                operation,
            },

            CoreError::BuildingNotFound { key } => CliError::NotFound {
                resource_type: "building".into(),
                identifier: key.to_string(),
                list_command: "buildings list".into(),
            },

            err @ CoreError::UnrecognizedEvent { .. } => CliError::Consistency {
                message: err.to_string(),
            },

            CoreError::Validation(errors) => CliError::Validation {
                reason: errors.to_string(),
            },

            CoreError::SwitchInFlight => CliError::SwitchInFlight,

            CoreError::ReloadStalled { pending } => CliError::ReloadStalled {
                pending: pending.join(", "),
            },

            CoreError::Config { message } => CliError::Validation { reason: message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
