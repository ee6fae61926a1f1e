//! Inbound message envelope.
//!
//! Every named message the runtime posts is parsed exactly once, at the
//! channel boundary, into an [`InboundMessage`]. Dispatch then matches on the
//! enum instead of re-inspecting channel names.
//!
//! # Reserved channels
//!
//! | channel                 | meaning                                  |
//! |-------------------------|------------------------------------------|
//! | `runtimeLoaded`         | the SDK finished loading                 |
//! | `throwLoadingError`     | the page could not bootstrap the SDK     |
//! | `log`                   | free-form log line from the page         |
//! | `eventListenerCallback` | an attached runtime event fired          |
//! | `reportError`           | uncaught error reported by the page      |
//! | `success_<id>`          | a pending call fulfilled                 |
//! | `error_<id>`            | a pending call rejected                  |

use serde_json::Value;

use super::call_id::{CallId, CallOutcome};
use super::events::{BridgeEvent, ListenerId};

pub const LOADED_CHANNEL: &str = "runtimeLoaded";
pub const LOAD_FAILED_CHANNEL: &str = "throwLoadingError";
pub const LOG_CHANNEL: &str = "log";
pub const EVENT_CHANNEL: &str = "eventListenerCallback";
pub const ERROR_CHANNEL: &str = "reportError";

/// Channels registered once, when the bridge is created.
pub const CONTROL_CHANNELS: [&str; 5] = [
    LOADED_CHANNEL,
    LOAD_FAILED_CHANNEL,
    LOG_CHANNEL,
    EVENT_CHANNEL,
    ERROR_CHANNEL,
];

/// A parsed message from the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Loaded,
    LoadFailed(String),
    Log(Value),
    ScriptError(Value),
    Event(EventSignal),
    Settled {
        id: CallId,
        outcome: CallOutcome,
        payload: Value,
    },
    Unrecognized {
        name: String,
        payload: Value,
    },
}

/// Payload of an `eventListenerCallback` message.
///
/// Attach fragments post `{"event": <name>, "listener": <id>}` so one
/// registration maps to exactly one callback. A bare event-name string fans
/// out to every callback of that event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSignal {
    pub event: Result<BridgeEvent, String>,
    pub listener: Option<ListenerId>,
}

impl InboundMessage {
    /// Classify a message by the channel it arrived on.
    pub fn parse(name: &str, payload: Value) -> Self {
        match name {
            LOADED_CHANNEL => InboundMessage::Loaded,
            LOAD_FAILED_CHANNEL => InboundMessage::LoadFailed(match payload {
                Value::String(message) if !message.is_empty() => message,
                _ => "Error loading webpage".to_string(),
            }),
            LOG_CHANNEL => InboundMessage::Log(payload),
            ERROR_CHANNEL => InboundMessage::ScriptError(payload),
            EVENT_CHANNEL => InboundMessage::Event(EventSignal::from_payload(&payload)),
            _ => match CallId::from_channel(name) {
                Some((id, outcome)) => InboundMessage::Settled {
                    id,
                    outcome,
                    payload,
                },
                None => InboundMessage::Unrecognized {
                    name: name.to_string(),
                    payload,
                },
            },
        }
    }
}

impl EventSignal {
    fn from_payload(payload: &Value) -> Self {
        let (name, listener) = match payload {
            Value::String(name) => (name.clone(), None),
            Value::Object(map) => (
                map.get("event")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                map.get("listener").and_then(Value::as_u64).map(ListenerId::new),
            ),
            other => (other.to_string(), None),
        };
        let event = name.parse::<BridgeEvent>().map_err(|_| name);
        Self { event, listener }
    }
}

/// Render a payload for logging: strings verbatim, everything else as JSON.
pub(crate) fn display_payload(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
