//! Typed surface over the runtime's SDK object.
//!
//! Each call builds a script fragment, issues it through the
//! [`Bridge`](crate::bridge::Bridge) and decodes the answer with the strategy
//! the SDK property needs.

mod library;
mod music;
mod player;
mod queue;

pub use library::CloudLibrary;
pub use music::{MusicContext, QueueSource};
pub use player::Player;
pub use queue::{Queue, SongKind};
