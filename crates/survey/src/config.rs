//! CLI configuration, a thin wrapper around `survey_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--backend, --events, --token, --timeout).

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use survey_config::{Config, Defaults, Profile, config_path, load_config};
use survey_core::SessionConfig;
use survey_core::config::derive_events_url;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build the `SessionConfig` for this invocation.
///
/// Precedence: flags > profile > defaults. With no profile at all a
/// `--backend` flag is enough.
pub fn session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &profile_name, &cfg.defaults, global),
        None if global.profile.is_some() => Err(survey_config::ConfigError::UnknownProfile {
            profile: profile_name,
        }
        .into()),
        None => from_flags(global, &cfg),
    }
}

fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<SessionConfig, CliError> {
    let mut config = survey_config::profile_to_session_config(profile, profile_name, defaults)?;
    apply_overrides(&mut config, global)?;
    Ok(config)
}

fn from_flags(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let raw = global.backend.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let mut config = SessionConfig::new(parse_url("backend", raw)?);
    config.timeout = Duration::from_secs(cfg.defaults.timeout);
    config.reload_watchdog = Duration::from_secs(cfg.defaults.reload_watchdog_secs);
    apply_overrides(&mut config, global)?;
    Ok(config)
}

fn apply_overrides(config: &mut SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(raw) = global.backend.as_deref() {
        config.backend_url = parse_url("backend", raw)?;
        config.events_url = derive_events_url(&config.backend_url);
    }
    if let Some(raw) = global.events.as_deref() {
        config.events_url = Some(parse_url("events", raw)?);
    }
    if let Some(token) = &global.token {
        config.auth_token = Some(SecretString::from(token.clone()));
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

fn parse_url(field: &str, raw: &str) -> Result<Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        reason: format!("{field}: invalid URL: {raw}"),
    })
}
