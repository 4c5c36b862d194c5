use thiserror::Error;

/// Top-level error type for the `survey-api` crate.
///
/// Covers every failure mode of the backend boundary: transport, command
/// rejection, the "no rows updated" outcome, event channel, and decoding.
/// `survey-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The backend refused the session token.
    #[error("Backend rejected the session token")]
    Unauthorized,

    // ── Command outcomes ────────────────────────────────────────────
    /// The backend reported a failure for an invoked command.
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    /// The backend executed an update that matched no stored row.
    #[error("{command}: no rows updated")]
    NoRowsUpdated { command: String },

    // ── Events ──────────────────────────────────────────────────────
    /// WebSocket connection to the event endpoint failed.
    #[error("Event channel connection failed: {0}")]
    WebSocketConnect(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` for the informational "no rows updated" outcome.
    pub fn is_no_rows_updated(&self) -> bool {
        matches!(self, Self::NoRowsUpdated { .. })
    }

    /// The command this error belongs to, if it came from an invocation.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Command { command, .. } | Self::NoRowsUpdated { command } => Some(command),
            _ => None,
        }
    }
}
