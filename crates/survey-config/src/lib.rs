//! Shared configuration for the survey desk.
//!
//! TOML profiles, session-token resolution (env + keyring + plaintext),
//! and translation to `survey_core::SessionConfig`. The binary layers its
//! command-line overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use survey_core::SessionConfig;
use survey_core::config::derive_events_url;

const KEYRING_SERVICE: &str = "survey";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}' in the config file")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    /// Returns the resolved profile name alongside the profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name.to_owned(), p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Stalled-reload watchdog in seconds; `0` disables it.
    #[serde(default = "default_reload_watchdog")]
    pub reload_watchdog_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            reload_watchdog_secs: default_reload_watchdog(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_reload_watchdog() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend command endpoint (e.g., "http://127.0.0.1:1420").
    pub backend: String,

    /// Event channel endpoint. Derived from `backend` when absent.
    pub events: Option<String>,

    /// Session token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the session token.
    pub token_env: Option<String>,

    /// Override request timeout.
    pub timeout: Option<u64>,

    /// Override the stalled-reload watchdog.
    pub reload_watchdog_secs: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "survey", "survey").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("survey");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file yields
/// the defaults. Environment keys use `__` as the nesting separator
/// (`SURVEY_DEFAULTS__TIMEOUT=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SURVEY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the session token: `token_env` → system keyring → plaintext.
/// `None` when no source yields one; a local backend usually needs none.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_token_with(profile, |env_name| std::env::var(env_name).ok(), || {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
            .ok()
            .and_then(|entry| entry.get_password().ok())
    })
}

fn resolve_token_with(
    profile: &Profile,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(value) = profile.token_env.as_deref().and_then(env) {
        return Some(SecretString::from(value));
    }

    // 2. System keyring
    if let Some(secret) = keyring() {
        return Some(SecretString::from(secret));
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

// ── SessionConfig translation ───────────────────────────────────────

/// Build a `SessionConfig` from a profile, falling back to `defaults`
/// for anything the profile leaves unset.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let mut config = session_config_without_token(profile, defaults)?;
    config.auth_token = resolve_token(profile, profile_name);
    Ok(config)
}

fn session_config_without_token(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let backend_url = parse_url("backend", &profile.backend)?;
    let events_url = match profile.events.as_deref() {
        Some(events) => Some(parse_url("events", events)?),
        None => derive_events_url(&backend_url),
    };

    let mut config = SessionConfig::new(backend_url);
    config.events_url = events_url;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.reload_watchdog = Duration::from_secs(
        profile
            .reload_watchdog_secs
            .unwrap_or(defaults.reload_watchdog_secs),
    );
    Ok(config)
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}
