// Shared transport configuration for building reqwest::Client instances.
//
// The invoke client and the event stream share the timeout and session
// token through this module.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Session token handed out by the backend process at launch.
    pub auth_token: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The session token, if any, is installed as a default
    /// `Authorization: Bearer` header.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("survey/", env!("CARGO_PKG_VERSION")));

        if let Some(header) = self.bearer_header()? {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, header);
            builder = builder.default_headers(headers);
        }

        builder.build().map_err(Error::Transport)
    }

    /// The `Authorization` header value, also used on the WebSocket upgrade.
    pub fn bearer_header(&self) -> Result<Option<HeaderValue>, Error> {
        let Some(ref token) = self.auth_token else {
            return Ok(None);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| Error::Unauthorized)?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}
