pub mod api;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod queue;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{CloudLibrary, MusicContext, Player, Queue, QueueSource, SongKind};
pub use bridge::{Bridge, BridgeEvent, DecodeStrategy, Pending, ScriptChannel};
pub use config::{BridgeSettings, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use queue::{QueueReconciler, QueueUpdate};
