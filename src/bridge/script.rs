//! Script fragment builders.
//!
//! Every piece of source text the bridge injects on its own behalf is built
//! here, so the calling conventions the page relies on live in one place.

use serde::Serialize;

use super::channel::ScriptChannel;
use super::events::{BridgeEvent, ListenerId};
use super::message::{EVENT_CHANNEL, LOG_CHANNEL};

/// Global the SDK instance is bound to inside the page.
pub const SDK_GLOBAL: &str = "music";

/// Render `value` as a script string literal.
pub fn js_string(value: &str) -> String {
    // JSON string syntax is a subset of script string syntax.
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Render a slice of serializable values as a script array literal.
pub fn js_array<T: Serialize>(values: &[T]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Continuation appended to a promise-valued fragment.
///
/// The fulfilled value (or an empty string when `returns_value` is false) is
/// posted to the success channel; the rejection is stringified and posted to
/// the error channel. A failed post is logged inside the page, never thrown.
pub(crate) fn continuation_suffix(
    channel: &dyn ScriptChannel,
    success: &str,
    error: &str,
    returns_value: bool,
) -> String {
    let response = if returns_value { "response" } else { "''" };
    let log_err = channel.post_expression(LOG_CHANNEL, "String(err)");
    format!(
        ".then(function(response) {{ try {{ {post_success}; }} catch (err) {{ {log_err}; }} }})\
         .catch(function(error) {{ var errorString = JSON.stringify(error); \
         try {{ {post_error}; }} catch (err) {{ {log_err}; }} }});",
        post_success = channel.post_expression(success, response),
        post_error = channel.post_expression(error, "errorString"),
    )
}

/// Fragment that attaches one registry entry to the runtime.
///
/// The listener id travels with the callback message so dispatch reaches
/// exactly the registration that was attached.
pub(crate) fn attach_listener(
    channel: &dyn ScriptChannel,
    event: BridgeEvent,
    listener: ListenerId,
) -> String {
    let payload = format!(
        "{{event: {}, listener: {}}}",
        js_string(event.as_str()),
        listener.as_u64()
    );
    format!(
        "{SDK_GLOBAL}.addEventListener({}, function() {{ {}; }});",
        js_string(event.as_str()),
        channel.post_expression(EVENT_CHANNEL, &payload)
    )
}
