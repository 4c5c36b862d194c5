// ── Runtime session configuration ──
//
// Describes *how* to reach the backend process and how patient the reload
// protocol should be. Carries the session token but never touches disk;
// the binary builds a `SessionConfig` (usually via survey-config) and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default request timeout for backend commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time a reload may wait on participants before it is reported
/// as stalled.
pub const DEFAULT_RELOAD_WATCHDOG: Duration = Duration::from_secs(30);

/// Configuration for one front-end session against one backend process.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Command endpoint base (e.g. `http://127.0.0.1:1420`).
    pub backend_url: Url,
    /// Event channel endpoint. `None` disables pushed events.
    pub events_url: Option<Url>,
    /// Bearer token presented to the backend, if it requires one.
    pub auth_token: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
    /// Stalled-reload watchdog. `Duration::ZERO` disables it.
    pub reload_watchdog: Duration,
    /// Event channel reconnection: first delay.
    pub reconnect_initial_delay: Duration,
    /// Event channel reconnection: delay ceiling.
    pub reconnect_max_delay: Duration,
}

impl SessionConfig {
    /// Defaults for everything but the backend address. The event
    /// endpoint is derived from it (see [`derive_events_url`]).
    pub fn new(backend_url: Url) -> Self {
        let events_url = derive_events_url(&backend_url);
        Self {
            backend_url,
            events_url,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            reload_watchdog: DEFAULT_RELOAD_WATCHDOG,
            reconnect_initial_delay: Duration::from_millis(500),
            reconnect_max_delay: Duration::from_secs(15),
        }
    }

    /// The watchdog duration, or `None` when disabled.
    pub fn watchdog(&self) -> Option<Duration> {
        (!self.reload_watchdog.is_zero()).then_some(self.reload_watchdog)
    }
}

/// `http(s)://host:port/...` → `ws(s)://host:port/events`.
///
/// Returns `None` for schemes that have no WebSocket counterpart.
pub fn derive_events_url(backend_url: &Url) -> Option<Url> {
    let scheme = match backend_url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => backend_url.scheme(),
        _ => return None,
    };
    let mut url = backend_url.clone();
    url.set_scheme(scheme).ok()?;
    url.set_path("/events");
    url.set_query(None);
    Some(url)
}
