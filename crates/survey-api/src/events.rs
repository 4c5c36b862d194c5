//! Pushed backend events over WebSocket, with auto-reconnect.
//!
//! The backend pushes dataset-level notifications (building changed, new
//! buildings imported) independently of any command call. This module
//! connects to the event endpoint, decodes each text frame into a typed
//! [`BackendEvent`], and fans them out through a
//! [`tokio::sync::broadcast`] channel. Reconnection uses exponential
//! backoff with jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use survey_api::{EventStream, ReconnectConfig, TransportConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let url = url::Url::parse("ws://127.0.0.1:1420/events")?;
//! let stream = EventStream::connect(url, &TransportConfig::default(), ReconnectConfig::default(), cancel)?;
//! let mut rx = stream.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::records::{Building, BuildingKey};
use crate::transport::TransportConfig;

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── BackendEvent ─────────────────────────────────────────────────────

/// A decoded event pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The backend switched its active building.
    BuildingChanged { key: BuildingKey },

    /// New buildings were introduced (e.g. by a spreadsheet import);
    /// `selected_key` names the one that should become active.
    NewBuilding {
        buildings: Vec<Building>,
        selected_key: BuildingKey,
    },

    /// A frame with a tag this client does not understand, or a known tag
    /// whose payload could not be decoded.
    Unrecognized { tag: String },
}

impl BackendEvent {
    /// Wire tag of the event.
    pub fn tag(&self) -> &str {
        match self {
            Self::BuildingChanged { .. } => "building_changed",
            Self::NewBuilding { .. } => "new_building",
            Self::Unrecognized { tag } => tag,
        }
    }
}

/// Raw frame: `{ "type": "<tag>", "payload": { ... } }`.
#[derive(Debug, Deserialize)]
struct EventFrame {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BuildingChangedPayload {
    key: BuildingKey,
}

#[derive(Debug, Deserialize)]
struct NewBuildingPayload {
    buildings: Vec<Building>,
    selected_key: BuildingKey,
}

/// Decode one text frame. Returns `None` only for frames that are not
/// event objects at all; unknown tags still produce an event.
pub fn parse_frame(text: &str) -> Option<BackendEvent> {
    let frame: EventFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse event frame");
            return None;
        }
    };

    let event = match frame.tag.as_str() {
        "building_changed" => serde_json::from_value::<BuildingChangedPayload>(frame.payload)
            .map(|p| BackendEvent::BuildingChanged { key: p.key }),
        "new_building" => serde_json::from_value::<NewBuildingPayload>(frame.payload).map(|p| {
            BackendEvent::NewBuilding {
                buildings: p.buildings,
                selected_key: p.selected_key,
            }
        }),
        _ => return Some(BackendEvent::Unrecognized { tag: frame.tag }),
    };

    Some(event.unwrap_or_else(|e| {
        tracing::warn!(error = %e, tag = %frame.tag, "malformed event payload");
        BackendEvent::Unrecognized { tag: frame.tag }
    }))
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for event channel reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 500ms.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 15s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            max_retries: None,
        }
    }
}

// ── EventStream ──────────────────────────────────────────────────────

/// Handle to a running event subscription.
///
/// Dropping the handle does not stop the background task; call
/// [`shutdown`](Self::shutdown) or cancel the token passed to `connect`.
pub struct EventStream {
    event_tx: broadcast::Sender<BackendEvent>,
    cancel: CancellationToken,
}

impl EventStream {
    /// Spawn the connect/read/reconnect loop and return immediately.
    pub fn connect(
        url: Url,
        transport: &TransportConfig,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let auth = transport
            .bearer_header()?
            .and_then(|v| v.to_str().ok().map(String::from));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let tx = event_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(url, tx, reconnect, task_cancel, auth).await;
        });

        Ok(Self { event_tx, cancel })
    }

    /// Get a new receiver. Lagging receivers get `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.event_tx.subscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

async fn ws_loop(
    url: Url,
    event_tx: broadcast::Sender<BackendEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    auth: Option<String>,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&url, &event_tx, &cancel, auth.as_deref()) => {
                match result {
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        tracing::info!("event channel closed cleanly, reconnecting");
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "event channel error");

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "event channel reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::debug!(delay_ms = delay.as_millis(), attempt, "waiting before reconnect");

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
    }

    tracing::debug!("event loop exiting");
}

async fn connect_and_read(
    url: &Url,
    event_tx: &broadcast::Sender<BackendEvent>,
    cancel: &CancellationToken,
    auth: Option<&str>,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to event channel");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(value) = auth {
        request = request.with_header("Authorization", value);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("event channel connected");

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some(event) = parse_frame(&text) {
                            tracing::debug!(tag = event.tag(), "backend event");
                            // No subscribers is fine; the session may not be listening yet.
                            let _ = event_tx.send(event);
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "event channel close frame");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => return Ok(()),
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// `delay = min(initial * 2^attempt, max) * (1 ± 25% jitter)`
///
/// Jitter is deterministic in the attempt number.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap, clippy::as_conversions)]
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = attempt.min(30) as i32;
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}
