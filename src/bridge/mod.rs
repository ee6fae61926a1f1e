//! Bridge to the embedded script runtime.
//!
//! The runtime offers no synchronous return values and no promise interop at
//! the host boundary. This module turns that into a callback and future API:
//!
//! - [`channel`]: the transport seam ([`ScriptChannel`])
//! - [`decoder`]: typed decoding of runtime values
//! - [`host`]: the [`Bridge`] correlator itself
//! - [`events`]: the runtime event taxonomy and durable listener registry
//! - [`message`]: the inbound message envelope
//!
//! Call ids, the pending-call table and the fragment builders are internal.

mod call_id;
pub mod channel;
pub mod decoder;
pub mod events;
mod host;
mod lifecycle;
pub mod message;
mod pending;
mod router;
pub mod script;

pub use call_id::{CallId, CallOutcome};
pub use channel::{EvalCompletion, PageRequest, ScriptChannel, ScriptError, ScriptErrorKind};
pub use decoder::{DecodeStrategy, DecodingError};
pub use events::{BridgeEvent, EventCallback, ListenerId, UnknownEvent};
pub use host::{Bridge, Callback, Dispatch, ErrorHandler, SuccessHandler, default_error_handler};
pub use lifecycle::{LoadState, LoadTimeout};
pub use message::InboundMessage;
pub use pending::{Completer, Pending};
