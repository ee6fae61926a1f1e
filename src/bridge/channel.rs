//! Transport seam between the bridge and the embedded runtime.
//!
//! The runtime is a black box: it evaluates injected source text and, at its
//! own discretion, posts named messages back to the host. A `ScriptChannel`
//! is the host-side handle for both directions. Inbound messages are not
//! pulled through the trait; the host forwards them to
//! [`Bridge::handle_message`](super::Bridge::handle_message) on the delivery
//! context of the runtime.

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Completion for a single evaluation.
///
/// Receives the evaluation result (`Value::Null` for `undefined`) or a
/// runtime-level error. Domain errors never arrive here.
pub type EvalCompletion = Box<dyn FnOnce(Result<Value, ScriptError>) + Send + 'static>;

/// Classification of runtime-level evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// The script threw (syntax error, undefined reference, ...).
    Exception,
    /// The script ran, but its result cannot be represented at the host
    /// boundary. Fires whenever a fire-and-forget promise is evaluated.
    UnsupportedResultType,
}

/// A runtime-level evaluation failure reported by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
}

impl ScriptError {
    /// Create an exception error
    pub fn exception(message: impl Into<String>) -> Self {
        Self {
            kind: ScriptErrorKind::Exception,
            message: message.into(),
        }
    }

    /// Create the error the runtime reports for unrepresentable results
    pub fn unsupported_result() -> Self {
        Self {
            kind: ScriptErrorKind::UnsupportedResultType,
            message: "JavaScript execution returned a result of an unsupported type".to_string(),
        }
    }

    /// Whether this error only signals an unrepresentable (async) result.
    pub fn is_benign(&self) -> bool {
        self.kind == ScriptErrorKind::UnsupportedResultType
    }
}

/// Everything the host page needs to bootstrap the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub developer_token: String,
    pub app_name: String,
    pub app_build: String,
    /// Origin the page is loaded from; must have a host.
    pub base_url: Url,
    pub icon_url: Option<Url>,
}

/// Host-side handle on the embedded runtime.
///
/// Implementations are expected to be cheap to call and must not invoke the
/// completion while holding any lock the completion could need: completions
/// routinely issue further calls through the bridge.
pub trait ScriptChannel: Send + Sync {
    /// Inject `source` for evaluation.
    ///
    /// Without a completion the evaluation is fire-and-forget.
    fn execute(&self, source: &str, completion: Option<EvalCompletion>);

    /// Start delivering messages posted to `name`.
    ///
    /// Messages posted to a name that was never registered are dropped by the
    /// runtime, so the bridge always registers before injecting a script that
    /// references the name.
    fn register_channel(&self, name: &str);

    /// Stop delivering messages posted to `name`.
    fn unregister_channel(&self, name: &str);

    /// Begin (re)loading the host page.
    fn load(&self, page: &PageRequest);

    /// Script expression that posts `payload` (a script expression) to `channel`.
    fn post_expression(&self, channel: &str, payload: &str) -> String {
        format!("webkit.messageHandlers.{channel}.postMessage({payload})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentChannel;

    impl ScriptChannel for SilentChannel {
        fn execute(&self, _source: &str, _completion: Option<EvalCompletion>) {}
        fn register_channel(&self, _name: &str) {}
        fn unregister_channel(&self, _name: &str) {}
        fn load(&self, _page: &PageRequest) {}
    }

    #[test]
    fn unsupported_result_is_benign() {
        assert!(ScriptError::unsupported_result().is_benign());
        assert!(!ScriptError::exception("SyntaxError").is_benign());
    }

    #[test]
    fn default_post_expression_uses_webkit_handlers() {
        let expr = SilentChannel.post_expression("log", "'hello'");
        assert_eq!(expr, "webkit.messageHandlers.log.postMessage('hello')");
    }
}
