// ── Core error types ──
//
// User-facing errors from survey-core. Consumers never see HTTP status
// codes or JSON parse failures directly; `From<survey_api::Error>`
// translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::model::{BuildingKey, ValidationErrors};
use crate::notify::NotificationKind;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Backend call errors ──────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Backend rejected the session token")]
    Unauthorized,

    #[error("{operation} failed: {message}")]
    Backend { operation: String, message: String },

    // ── Informational outcomes ───────────────────────────────────────
    #[error("{operation}: nothing was changed")]
    NoRowsUpdated { operation: String },

    // ── Consistency errors ───────────────────────────────────────────
    #[error("Building not found: {key}")]
    BuildingNotFound { key: BuildingKey },

    #[error("Unrecognized backend event: {tag}")]
    UnrecognizedEvent { tag: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    // ── Coordination ─────────────────────────────────────────────────
    #[error("A dataset switch is already in progress")]
    SwitchInFlight,

    #[error("Reload stalled waiting for: {}", pending.join(", "))]
    ReloadStalled { pending: Vec<String> },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// A lower-severity outcome that is not a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::NoRowsUpdated { .. })
    }

    /// The backend and the local model disagree about what exists.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::BuildingNotFound { .. } | Self::UnrecognizedEvent { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// How this error is posted to the notification channel.
    ///
    /// `None` for validation failures, which are reported inline next to
    /// the offending field instead.
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        match self {
            Self::Validation(_) => None,
            Self::NoRowsUpdated { .. } => Some(NotificationKind::Info),
            Self::SwitchInFlight => Some(NotificationKind::Warning),
            _ => Some(NotificationKind::Error),
        }
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<survey_api::Error> for CoreError {
    fn from(err: survey_api::Error) -> Self {
        match err {
            survey_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Backend {
                        operation: "request".into(),
                        message: e.to_string(),
                    }
                }
            }
            survey_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            survey_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            survey_api::Error::Unauthorized => CoreError::Unauthorized,
            survey_api::Error::Command { command, message } => CoreError::Backend {
                operation: command,
                message,
            },
            survey_api::Error::NoRowsUpdated { command } => {
                CoreError::NoRowsUpdated { operation: command }
            }
            survey_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Event channel connection failed: {reason}"),
            },
            survey_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
