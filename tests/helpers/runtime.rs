//! Plays the runtime's side of the message protocol against a recording channel.

use musicbridge::BridgeSettings;
use musicbridge::bridge::{Bridge, Dispatch};
use musicbridge::testing::RecordingChannel;
use serde_json::Value;

pub fn settings() -> BridgeSettings {
    BridgeSettings {
        developer_token: Some("dev-token".to_string()),
        app_name: Some("tests".to_string()),
        app_url: Some("https://app.example.com".to_string()),
        ..Default::default()
    }
}

/// Success and error channel of the most recently issued promise call.
pub fn last_call_channels(channel: &RecordingChannel) -> (String, String) {
    let success = channel
        .registered()
        .into_iter()
        .rev()
        .find(|name| name.starts_with("success_"))
        .expect("a promise call was issued");
    let error = success.replacen("success_", "error_", 1);
    (success, error)
}

/// Fulfil the most recent promise call with `payload`.
pub fn fulfil_last(bridge: &Bridge, channel: &RecordingChannel, payload: Value) -> Dispatch {
    let (success, _) = last_call_channels(channel);
    bridge.handle_message(&success, payload)
}

/// Reject the most recent promise call with a stringified `payload`.
pub fn reject_last(bridge: &Bridge, channel: &RecordingChannel, payload: Value) -> Dispatch {
    let (_, error) = last_call_channels(channel);
    bridge.handle_message(&error, Value::String(payload.to_string()))
}

/// The script injected for the most recent promise call, without its
/// continuation.
pub fn last_promise_fragment(channel: &RecordingChannel) -> String {
    let source = channel
        .executed()
        .into_iter()
        .rev()
        .find(|source| source.contains(".then(function(response)"))
        .expect("a promise call was injected");
    let end = source
        .find(".then(function(response)")
        .unwrap_or(source.len());
    source[..end].to_string()
}
