// Command invocation client
//
// Wraps `reqwest::Client` with the backend's invoke URL scheme and
// response envelope. Typed commands live in `commands.rs` as inherent
// methods so this module stays focused on transport mechanics.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error kind the backend uses for updates that matched no stored row.
const NO_ROWS_UPDATED: &str = "no_rows_updated";

/// Response envelope returned by every invoked command:
/// `{ "ok": true, "data": ... }` or `{ "ok": false, "error": { kind, message } }`.
#[derive(Debug, Deserialize)]
struct InvokeResponse {
    ok: bool,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<InvokeFailure>,
}

#[derive(Debug, Deserialize)]
struct InvokeFailure {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Raw client for the backend's command endpoint.
///
/// Each command is a `POST {base}/invoke/{command}` with a JSON argument
/// object. The envelope is stripped before the caller sees the payload.
pub struct InvokeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl InvokeClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the endpoint URL for a command: `{base}/invoke/{command}`.
    pub(crate) fn invoke_url(&self, command: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/invoke/{command}"))?)
    }

    /// Invoke a command and decode its `data` payload.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        command: &str,
        args: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.invoke_url(command)?;
        debug!(command, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(args)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(command, resp).await
    }
}

/// Parse the `{ ok, data, error }` envelope.
async fn parse_envelope<T: DeserializeOwned>(
    command: &str,
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    trace!(command, %status, bytes = body.len(), "invoke response");

    let envelope: InvokeResponse = match serde_json::from_str(&body) {
        Ok(env) => env,
        Err(_) if !status.is_success() => {
            return Err(Error::Command {
                command: command.to_owned(),
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }
        Err(e) => {
            return Err(Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body,
            });
        }
    };

    if !envelope.ok {
        let failure = envelope.error.unwrap_or(InvokeFailure {
            kind: None,
            message: None,
        });
        if failure.kind.as_deref() == Some(NO_ROWS_UPDATED) {
            return Err(Error::NoRowsUpdated {
                command: command.to_owned(),
            });
        }
        return Err(Error::Command {
            command: command.to_owned(),
            message: failure
                .message
                .unwrap_or_else(|| format!("HTTP {status}")),
        });
    }

    serde_json::from_value(envelope.data).map_err(|e| Error::Deserialization {
        message: format!("{command}: {e}"),
        body,
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_url_trims_trailing_slash() {
        let client = InvokeClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:1420/").expect("url"),
        );
        let url = client.invoke_url("list_rooms").expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:1420/invoke/list_rooms");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "ä".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(p));
    }
}
