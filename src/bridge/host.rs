//! The bridge: request/response/event correlation over a [`ScriptChannel`].
//!
//! # Call styles
//!
//! | method               | runtime result      | plumbing                        |
//! |----------------------|---------------------|---------------------------------|
//! | `evaluate`           | ignored             | evaluation completion only      |
//! | `evaluate_for_value` | synchronous value   | evaluation completion only      |
//! | `call_promise`       | promise, no value   | `success_<id>` / `error_<id>`   |
//! | `call_for_value`     | promise with value  | `success_<id>` / `error_<id>`   |
//!
//! Omitting the success continuation turns any of them into a fire-and-forget
//! evaluation. Each style has a future-returning counterpart (`run`, `value`,
//! `promise`, `promise_value`).
//!
//! # Locking
//!
//! State lives in short `std::sync::Mutex` sections. No continuation, event
//! callback or channel method is ever invoked while one is held, so callers
//! may issue further calls from inside any callback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;

use super::call_id::{CallId, CallOutcome};
use super::channel::{EvalCompletion, PageRequest, ScriptChannel, ScriptError};
use super::decoder::DecodeStrategy;
use super::events::{BridgeEvent, EventCallback, EventRegistry, ListenerId};
use super::lifecycle::{LoadLifecycle, LoadState, LoadTimeout};
use super::message::{CONTROL_CHANNELS, EventSignal, InboundMessage, display_payload};
use super::pending::{Pending, completion};
use super::router::{PendingCallTable, Settle, Settlement};
use super::script::{attach_listener, continuation_suffix};
use crate::error::{BridgeError, LockResultExt};

/// Error continuation; invoked at most once.
pub type ErrorHandler = Box<dyn FnOnce(BridgeError) + Send + 'static>;
/// Success continuation carrying a decoded value; invoked at most once.
pub type SuccessHandler<T> = Box<dyn FnOnce(T) + Send + 'static>;
/// Success continuation for calls without a value.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

const LOG_TARGET: &str = "musicbridge::bridge";

/// What `handle_message` did with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Routed to a control handler, an event or a pending call.
    Handled,
    /// A continuation channel whose call already settled or never existed.
    UnknownCall,
    /// Not a channel the bridge knows about.
    Unrecognized,
}

/// Handle on one runtime connection.
///
/// Cheap to clone; all clones share the same pending calls, listeners and
/// load state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    channel: Arc<dyn ScriptChannel>,
    calls: PendingCallTable,
    events: EventRegistry,
    lifecycle: Mutex<LoadLifecycle<ErrorHandler, Callback>>,
    load_timeout: LoadTimeout,
    /// Runtime the bridge was built on; arms watchdogs for loads started
    /// from threads outside it.
    runtime: Option<Handle>,
    enhanced_error_logging: AtomicBool,
}

impl BridgeInner {
    /// Remove a pending call and tear down its transport channels.
    fn take_call(&self, id: CallId) -> Option<Settle> {
        let settle = self.calls.take(id)?;
        self.channel.unregister_channel(&id.success_channel());
        self.channel.unregister_channel(&id.error_channel());
        Some(settle)
    }
}

impl Bridge {
    /// Create a bridge with the default load timeout.
    ///
    /// Registers the control channels up front so messages posted during page
    /// bootstrap are never dropped.
    pub fn new(channel: Arc<dyn ScriptChannel>) -> Self {
        Self::with_load_timeout(channel, LoadTimeout::default())
    }

    /// Create a bridge whose loads fail after `load_timeout`.
    ///
    /// The watchdog runs on the tokio runtime current at construction, so
    /// build the bridge inside one (or use [`with_runtime`](Self::with_runtime))
    /// when `load` will be called from the runtime's own delivery thread.
    pub fn with_load_timeout(channel: Arc<dyn ScriptChannel>, load_timeout: LoadTimeout) -> Self {
        Self::build(channel, load_timeout, Handle::try_current().ok())
    }

    /// Create a bridge whose load watchdogs run on `runtime`.
    ///
    /// # Usage
    ///
    /// ```ignore
    /// let runtime = tokio::runtime::Runtime::new()?;
    /// let bridge = Bridge::with_runtime(channel, LoadTimeout::default(), runtime.handle().clone());
    /// // safe to call from the web view's main thread
    /// bridge.load(&page, on_error);
    /// ```
    pub fn with_runtime(
        channel: Arc<dyn ScriptChannel>,
        load_timeout: LoadTimeout,
        runtime: Handle,
    ) -> Self {
        Self::build(channel, load_timeout, Some(runtime))
    }

    fn build(
        channel: Arc<dyn ScriptChannel>,
        load_timeout: LoadTimeout,
        runtime: Option<Handle>,
    ) -> Self {
        for name in CONTROL_CHANNELS {
            channel.register_channel(name);
        }
        Self {
            inner: Arc::new(BridgeInner {
                channel,
                calls: PendingCallTable::new(),
                events: EventRegistry::new(),
                lifecycle: Mutex::new(LoadLifecycle::new()),
                load_timeout,
                runtime,
                enhanced_error_logging: AtomicBool::new(false),
            }),
        }
    }

    /// Log fragments and raw responses alongside evaluation and decoding failures.
    pub fn set_enhanced_error_logging(&self, enabled: bool) {
        self.inner
            .enhanced_error_logging
            .store(enabled, Ordering::Relaxed);
    }

    /// Whether enhanced error logging is on.
    pub fn enhanced_error_logging(&self) -> bool {
        self.inner.enhanced_error_logging.load(Ordering::Relaxed)
    }

    /// Timeout every load of this bridge is armed with.
    pub fn load_timeout(&self) -> LoadTimeout {
        self.inner.load_timeout
    }

    /// Where the current load stands.
    pub fn load_state(&self) -> LoadState {
        self.inner
            .lifecycle
            .lock()
            .recover_poison("Bridge::load_state")
            .state
    }

    /// Shorthand for `load_state() == LoadState::Loaded`.
    ///
    /// Listeners registered while this is true are attached immediately.
    pub fn is_loaded(&self) -> bool {
        self.load_state() == LoadState::Loaded
    }

    /// Number of promise calls still waiting for the runtime.
    pub fn pending_calls(&self) -> usize {
        self.inner.calls.pending_count()
    }

    /// Whether a call with this id is still waiting for the runtime.
    pub fn is_pending(&self, id: CallId) -> bool {
        self.inner.calls.contains(id)
    }

    /// Number of durable listener registrations.
    pub fn listener_count(&self) -> usize {
        self.inner.events.len()
    }

    // ---------------------------------------------------------------------
    // Outbound calls
    // ---------------------------------------------------------------------

    /// Evaluate `fragment`, ignoring its result.
    ///
    /// The benign unsupported-result error counts as success when a success
    /// continuation is given and is dropped silently otherwise.
    pub fn evaluate(&self, fragment: &str, on_success: Option<Callback>, on_error: ErrorHandler) {
        let owned = fragment.to_string();
        let enhanced = self.enhanced_error_logging();
        let completion: EvalCompletion = Box::new(move |result| match result {
            Ok(_) => {
                if let Some(on_success) = on_success {
                    on_success();
                }
            }
            Err(error) if error.is_benign() => match on_success {
                Some(on_success) => on_success(),
                None => log::trace!(target: LOG_TARGET, "Filtered benign evaluation error"),
            },
            Err(error) => {
                log_evaluation_failure(enhanced, &owned, &error.message);
                on_error(BridgeError::javascript(error.message, Some(owned)));
            }
        });
        self.inner.channel.execute(fragment, Some(completion));
    }

    /// Evaluate `fragment` and decode its synchronous result.
    ///
    /// Without `on_success` this is a fire-and-forget [`evaluate`](Self::evaluate).
    pub fn evaluate_for_value<T>(
        &self,
        fragment: &str,
        strategy: DecodeStrategy,
        on_success: Option<SuccessHandler<T>>,
        on_error: ErrorHandler,
    ) where
        T: DeserializeOwned + Send + 'static,
    {
        let Some(on_success) = on_success else {
            self.evaluate(fragment, None, on_error);
            return;
        };
        let owned = fragment.to_string();
        let enhanced = self.enhanced_error_logging();
        let completion: EvalCompletion = Box::new(move |result| match result {
            Ok(raw) => match strategy.decode::<T>(&raw) {
                Ok(value) => on_success(value),
                Err(error) => {
                    log_decoding_failure(enhanced, &owned, &raw, &error.to_string());
                    on_error(error.into());
                }
            },
            Err(error) => {
                log_evaluation_failure(enhanced, &owned, &error.message);
                on_error(BridgeError::javascript(error.message, Some(owned)));
            }
        });
        self.inner.channel.execute(fragment, Some(completion));
    }

    /// Evaluate a promise-valued `fragment`; succeed when it fulfills.
    pub fn call_promise(&self, fragment: &str, on_success: Option<Callback>, on_error: ErrorHandler) {
        let Some(on_success) = on_success else {
            self.evaluate(fragment, None, on_error);
            return;
        };
        self.issue_promise(
            fragment,
            false,
            Box::new(move |settlement| match settlement {
                Settlement::Fulfilled(_) => on_success(),
                Settlement::Rejected(raw) => on_error(rejection(raw)),
                Settlement::Failed(error) => on_error(error),
            }),
        );
    }

    /// Evaluate a promise-valued `fragment` and decode what it fulfills with.
    ///
    /// Without `on_success` this is a fire-and-forget [`evaluate`](Self::evaluate)
    /// and no channels are allocated.
    pub fn call_for_value<T>(
        &self,
        fragment: &str,
        strategy: DecodeStrategy,
        on_success: Option<SuccessHandler<T>>,
        on_error: ErrorHandler,
    ) where
        T: DeserializeOwned + Send + 'static,
    {
        let Some(on_success) = on_success else {
            self.evaluate(fragment, None, on_error);
            return;
        };
        let owned = fragment.to_string();
        let enhanced = self.enhanced_error_logging();
        self.issue_promise(
            fragment,
            true,
            Box::new(move |settlement| match settlement {
                Settlement::Fulfilled(raw) => match strategy.decode::<T>(&raw) {
                    Ok(value) => on_success(value),
                    Err(error) => {
                        log_decoding_failure(enhanced, &owned, &raw, &error.to_string());
                        on_error(error.into());
                    }
                },
                Settlement::Rejected(raw) => on_error(rejection(raw)),
                Settlement::Failed(error) => on_error(error),
            }),
        );
    }

    /// Register the continuation, then the channels, then inject.
    fn issue_promise(&self, fragment: &str, returns_value: bool, settle: Settle) -> CallId {
        let channel = &self.inner.channel;
        let id = self.inner.calls.register(settle);
        let success = id.success_channel();
        let error = id.error_channel();
        channel.register_channel(&success);
        channel.register_channel(&error);

        let source = format!(
            "{fragment}{}",
            continuation_suffix(channel.as_ref(), &success, &error, returns_value)
        );
        let weak: Weak<BridgeInner> = Arc::downgrade(&self.inner);
        let owned = fragment.to_string();
        let enhanced = self.enhanced_error_logging();
        channel.execute(
            &source,
            Some(Box::new(move |result: Result<Value, ScriptError>| {
                let Err(error) = result else {
                    return;
                };
                // Evaluating the suffixed fragment yields a promise, which
                // the runtime always reports as an unsupported result.
                if error.is_benign() {
                    return;
                }
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                log_evaluation_failure(enhanced, &owned, &error.message);
                if let Some(settle) = inner.take_call(id) {
                    settle(Settlement::Failed(BridgeError::javascript(
                        error.message,
                        Some(owned),
                    )));
                }
            })),
        );
        log::debug!(target: LOG_TARGET, "Issued call {}", id);
        id
    }

    /// Evaluate `fragment` and resolve once the runtime acknowledges it.
    pub fn run(&self, fragment: &str) -> Pending<()> {
        let (on_success, on_error, pending) = completion::<()>();
        self.evaluate(fragment, Some(Box::new(move || on_success(()))), on_error);
        pending
    }

    /// Future form of [`evaluate_for_value`](Self::evaluate_for_value).
    pub fn value<T>(&self, fragment: &str, strategy: DecodeStrategy) -> Pending<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (on_success, on_error, pending) = completion::<T>();
        self.evaluate_for_value(fragment, strategy, Some(on_success), on_error);
        pending
    }

    /// Future form of [`call_promise`](Self::call_promise).
    pub fn promise(&self, fragment: &str) -> Pending<()> {
        let (on_success, on_error, pending) = completion::<()>();
        self.call_promise(fragment, Some(Box::new(move || on_success(()))), on_error);
        pending
    }

    /// Future form of [`call_for_value`](Self::call_for_value).
    pub fn promise_value<T>(&self, fragment: &str, strategy: DecodeStrategy) -> Pending<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (on_success, on_error, pending) = completion::<T>();
        self.call_for_value(fragment, strategy, Some(on_success), on_error);
        pending
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Register a durable listener for `event`.
    ///
    /// If the runtime is already loaded the listener is attached right away;
    /// otherwise it is attached when the next load succeeds. A `BridgeReady`
    /// listener registered after load runs immediately.
    pub fn add_event_listener<F>(&self, event: BridgeEvent, callback: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        // Registered under the lifecycle lock so a concurrent load-succeeded
        // either sees this entry in its snapshot or leaves it to us.
        let (id, loaded) = {
            let lifecycle = self
                .inner
                .lifecycle
                .lock()
                .recover_poison("Bridge::add_event_listener");
            let id = self.inner.events.register(event, callback.clone());
            (id, lifecycle.state == LoadState::Loaded)
        };
        if loaded {
            self.activate(id, event, callback);
        }
        id
    }

    fn activate(&self, id: ListenerId, event: BridgeEvent, callback: EventCallback) {
        if event == BridgeEvent::BridgeReady {
            callback();
        } else {
            let fragment = attach_listener(self.inner.channel.as_ref(), event, id);
            self.evaluate(&fragment, None, default_error_handler());
        }
    }

    fn dispatch_event(&self, signal: EventSignal) {
        let event = match signal.event {
            Ok(event) => event,
            Err(name) => {
                log::debug!(target: LOG_TARGET, "Ignoring unknown runtime event {:?}", name);
                return;
            }
        };
        let callbacks = match signal.listener {
            Some(listener) => self.inner.events.callback(listener, event).into_iter().collect(),
            None => self.inner.events.callbacks_for(event),
        };
        if callbacks.is_empty() {
            log::debug!(target: LOG_TARGET, "No listener for event {}", event);
        }
        for callback in callbacks {
            callback();
        }
    }

    // ---------------------------------------------------------------------
    // Inbound messages
    // ---------------------------------------------------------------------

    /// Route one message posted by the runtime.
    ///
    /// Must be called on the runtime's delivery context, in delivery order.
    pub fn handle_message(&self, name: &str, body: Value) -> Dispatch {
        match InboundMessage::parse(name, body) {
            InboundMessage::Loaded => {
                self.runtime_loaded();
                Dispatch::Handled
            }
            InboundMessage::LoadFailed(message) => {
                self.throw_loading_error(BridgeError::loading_failed(message));
                Dispatch::Handled
            }
            InboundMessage::Log(payload) => {
                log::info!(target: "musicbridge::runtime", "{}", display_payload(&payload));
                Dispatch::Handled
            }
            InboundMessage::ScriptError(payload) => {
                log::error!(
                    target: "musicbridge::runtime",
                    "Uncaught runtime error: {}",
                    display_payload(&payload)
                );
                Dispatch::Handled
            }
            InboundMessage::Event(signal) => {
                self.dispatch_event(signal);
                Dispatch::Handled
            }
            InboundMessage::Settled {
                id,
                outcome,
                payload,
            } => match self.inner.take_call(id) {
                Some(settle) => {
                    log::debug!(target: LOG_TARGET, "Call {} settled: {:?}", id, outcome);
                    settle(match outcome {
                        CallOutcome::Fulfilled => Settlement::Fulfilled(payload),
                        CallOutcome::Rejected => Settlement::Rejected(payload),
                    });
                    Dispatch::Handled
                }
                None => {
                    log::warn!(
                        target: LOG_TARGET,
                        "Message on {} for a call that is no longer pending",
                        name
                    );
                    Dispatch::UnknownCall
                }
            },
            InboundMessage::Unrecognized { name, .. } => {
                log::debug!(target: LOG_TARGET, "Ignoring message on unknown channel {}", name);
                Dispatch::Unrecognized
            }
        }
    }

    // ---------------------------------------------------------------------
    // Load lifecycle
    // ---------------------------------------------------------------------

    /// Start (re)loading the runtime page.
    ///
    /// `on_error` receives the first loading failure or watchdog timeout of
    /// this load; later failures go to [`default_error_handler`].
    pub fn load(&self, page: &PageRequest, on_error: ErrorHandler) {
        self.load_with_ready(page, None, on_error);
    }

    /// Start (re)loading the runtime page and resolve once this load succeeds.
    ///
    /// Unlike a `BridgeReady` listener, the readiness wait belongs to this
    /// load only. A bridge that is already loaded does not satisfy it, and a
    /// newer load supersedes it, which resolves the future with
    /// [`BridgeError::Abandoned`].
    pub fn load_until_ready(&self, page: &PageRequest) -> Pending<()> {
        let (on_ready, on_error, pending) = completion::<()>();
        self.load_with_ready(page, Some(Box::new(move || on_ready(()))), on_error);
        pending
    }

    fn load_with_ready(&self, page: &PageRequest, on_ready: Option<Callback>, on_error: ErrorHandler) {
        let has_host = page.base_url.host_str().is_some_and(|host| !host.is_empty());
        if !has_host {
            on_error(BridgeError::loading_failed("Invalid app URL"));
            return;
        }
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.inner.runtime.clone()) else {
            log::error!(
                target: LOG_TARGET,
                "Refusing to load without an async runtime for the load watchdog"
            );
            on_error(BridgeError::loading_failed(
                "No async runtime available to run the load watchdog",
            ));
            return;
        };

        let generation = self
            .inner
            .lifecycle
            .lock()
            .recover_poison("Bridge::load")
            .begin(on_error, on_ready);
        log::info!(
            target: LOG_TARGET,
            "Loading runtime page from {} (load #{})",
            page.base_url,
            generation
        );
        self.inner.channel.load(page);
        self.arm_watchdog(&runtime, generation);
    }

    fn arm_watchdog(&self, runtime: &Handle, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        let timeout = self.inner.load_timeout;
        runtime.spawn(async move {
            tokio::time::sleep(timeout.as_duration()).await;
            if let Some(inner) = weak.upgrade() {
                Bridge { inner }.watchdog_expired(generation);
            }
        });
    }

    fn watchdog_expired(&self, generation: u64) {
        let handler = {
            let mut lifecycle = self
                .inner
                .lifecycle
                .lock()
                .recover_poison("Bridge::watchdog_expired");
            if lifecycle.generation != generation {
                return;
            }
            match lifecycle.fail() {
                Some(handler) => handler,
                None => return,
            }
        };
        let error = BridgeError::Timeout {
            secs: self.inner.load_timeout.as_secs(),
        };
        log::error!(target: LOG_TARGET, "{}", error);
        handler.unwrap_or_else(default_error_handler)(error);
    }

    fn runtime_loaded(&self) {
        let (registrations, on_ready) = {
            let mut lifecycle = self
                .inner
                .lifecycle
                .lock()
                .recover_poison("Bridge::runtime_loaded");
            let Some(on_ready) = lifecycle.complete() else {
                log::warn!(
                    target: LOG_TARGET,
                    "Ignoring load-succeeded for load #{} which already failed",
                    lifecycle.generation
                );
                return;
            };
            (self.inner.events.snapshot(), on_ready)
        };
        log::info!(
            target: LOG_TARGET,
            "Runtime loaded; activating {} listener(s)",
            registrations.len()
        );
        for (id, event, callback) in registrations {
            self.activate(id, event, callback);
        }
        if let Some(on_ready) = on_ready {
            on_ready();
        }
    }

    /// Fail the current load with `error`.
    ///
    /// Only the first failure of a load reaches the handler given to
    /// [`load`](Self::load); anything after that goes to the default handler.
    pub fn throw_loading_error(&self, error: BridgeError) {
        let handler = self
            .inner
            .lifecycle
            .lock()
            .recover_poison("Bridge::throw_loading_error")
            .fail()
            .flatten();
        handler.unwrap_or_else(default_error_handler)(error);
    }

    /// Report that the host page itself failed to navigate.
    pub fn handle_navigation_failure(&self, message: impl Into<String>) {
        self.throw_loading_error(BridgeError::navigation_failed(message));
    }
}

/// Handler used when no caller-supplied error continuation is available.
pub fn default_error_handler() -> ErrorHandler {
    Box::new(|error| {
        if cfg!(debug_assertions) {
            log::error!(target: LOG_TARGET, "{:?}", error);
        } else {
            log::error!(target: LOG_TARGET, "{}", error);
        }
    })
}

/// Rejections arrive as `JSON.stringify(error)`. Anything that is not a JSON
/// object is kept verbatim under `"unknown"`.
fn rejection(raw: Value) -> BridgeError {
    let context = match DecodeStrategy::JsonText.decode::<BTreeMap<String, Value>>(&raw) {
        Ok(fields) => fields
            .into_iter()
            .map(|(key, value)| (key, display_payload(&value)))
            .collect(),
        Err(_) => BTreeMap::from([("unknown".to_string(), display_payload(&raw))]),
    };
    BridgeError::PromiseRejected { context }
}

fn log_evaluation_failure(enhanced: bool, fragment: &str, message: &str) {
    if enhanced {
        log::error!(
            target: LOG_TARGET,
            "Evaluation failed: {}\n  fragment: {}",
            message,
            fragment
        );
    } else {
        log::debug!(target: LOG_TARGET, "Evaluation failed: {}", message);
    }
}

fn log_decoding_failure(enhanced: bool, fragment: &str, raw: &Value, reason: &str) {
    if enhanced {
        log::error!(
            target: LOG_TARGET,
            "{}\n  fragment: {}\n  response: {}",
            reason,
            fragment,
            raw
        );
    } else {
        log::debug!(target: LOG_TARGET, "{}", reason);
    }
}
