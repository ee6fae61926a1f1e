//! Runtime event taxonomy and the durable listener registry.
//!
//! The runtime forgets its own listener registrations whenever the page
//! reloads. The registry kept here is the source of truth; the bridge
//! re-attaches every entry after each load.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::error::LockResultExt;

/// Callback invoked each time its event fires.
pub type EventCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Events emitted by the runtime, plus the `BridgeReady` pseudo-event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BridgeEvent {
    AuthorizationStatusDidChange,
    AuthorizationStatusWillChange,
    EligibleForSubscribeView,
    Loaded,
    MediaCanPlay,
    MediaItemDidChange,
    MediaItemWillChange,
    MediaPlaybackError,
    MetadataDidChange,
    /// The bridge itself finished loading. Never attached to the runtime.
    BridgeReady,
    PlaybackBitrateDidChange,
    PlaybackDurationDidChange,
    PlaybackProgressDidChange,
    PlaybackStateDidChange,
    PlaybackStateWillChange,
    PlaybackTargetAvailableDidChange,
    PlaybackTimeDidChange,
    PlaybackVolumeDidChange,
    PrimaryPlayerDidChange,
    QueueItemsDidChange,
    QueuePositionDidChange,
    StorefrontCountryCodeDidChange,
    StorefrontIdentifierDidChange,
    UserTokenDidChange,
}

impl BridgeEvent {
    pub const ALL: [BridgeEvent; 24] = [
        BridgeEvent::AuthorizationStatusDidChange,
        BridgeEvent::AuthorizationStatusWillChange,
        BridgeEvent::EligibleForSubscribeView,
        BridgeEvent::Loaded,
        BridgeEvent::MediaCanPlay,
        BridgeEvent::MediaItemDidChange,
        BridgeEvent::MediaItemWillChange,
        BridgeEvent::MediaPlaybackError,
        BridgeEvent::MetadataDidChange,
        BridgeEvent::BridgeReady,
        BridgeEvent::PlaybackBitrateDidChange,
        BridgeEvent::PlaybackDurationDidChange,
        BridgeEvent::PlaybackProgressDidChange,
        BridgeEvent::PlaybackStateDidChange,
        BridgeEvent::PlaybackStateWillChange,
        BridgeEvent::PlaybackTargetAvailableDidChange,
        BridgeEvent::PlaybackTimeDidChange,
        BridgeEvent::PlaybackVolumeDidChange,
        BridgeEvent::PrimaryPlayerDidChange,
        BridgeEvent::QueueItemsDidChange,
        BridgeEvent::QueuePositionDidChange,
        BridgeEvent::StorefrontCountryCodeDidChange,
        BridgeEvent::StorefrontIdentifierDidChange,
        BridgeEvent::UserTokenDidChange,
    ];

    /// Event name as the runtime spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeEvent::AuthorizationStatusDidChange => "authorizationStatusDidChange",
            BridgeEvent::AuthorizationStatusWillChange => "authorizationStatusWillChange",
            BridgeEvent::EligibleForSubscribeView => "eligibleForSubscribeView",
            BridgeEvent::Loaded => "loaded",
            BridgeEvent::MediaCanPlay => "mediaCanPlay",
            BridgeEvent::MediaItemDidChange => "mediaItemDidChange",
            BridgeEvent::MediaItemWillChange => "mediaItemWillChange",
            BridgeEvent::MediaPlaybackError => "mediaPlaybackError",
            BridgeEvent::MetadataDidChange => "metadataDidChange",
            BridgeEvent::BridgeReady => "musicKitDidLoad",
            BridgeEvent::PlaybackBitrateDidChange => "playbackBitrateDidChange",
            BridgeEvent::PlaybackDurationDidChange => "playbackDurationDidChange",
            BridgeEvent::PlaybackProgressDidChange => "playbackProgressDidChange",
            BridgeEvent::PlaybackStateDidChange => "playbackStateDidChange",
            BridgeEvent::PlaybackStateWillChange => "playbackStateWillChange",
            BridgeEvent::PlaybackTargetAvailableDidChange => "playbackTargetAvailableDidChange",
            BridgeEvent::PlaybackTimeDidChange => "playbackTimeDidChange",
            BridgeEvent::PlaybackVolumeDidChange => "playbackVolumeDidChange",
            BridgeEvent::PrimaryPlayerDidChange => "primaryPlayerDidChange",
            BridgeEvent::QueueItemsDidChange => "queueItemsDidChange",
            BridgeEvent::QueuePositionDidChange => "queuePositionDidChange",
            BridgeEvent::StorefrontCountryCodeDidChange => "storefrontCountryCodeDidChange",
            BridgeEvent::StorefrontIdentifierDidChange => "storefrontIdentifierDidChange",
            BridgeEvent::UserTokenDidChange => "userTokenDidChange",
        }
    }
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an event name is not part of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown runtime event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for BridgeEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BridgeEvent::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Identity of a single registration, unique per bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

struct Registration {
    id: ListenerId,
    event: BridgeEvent,
    callback: EventCallback,
}

/// Ordered, append-only store of event listeners.
///
/// Registering the same event twice accumulates callbacks; insertion order is
/// invocation order. There is no unsubscribe.
pub(crate) struct EventRegistry {
    state: Mutex<RegistryState>,
}

struct RegistryState {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl EventRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_id: 1,
                registrations: Vec::new(),
            }),
        }
    }

    pub(crate) fn register(&self, event: BridgeEvent, callback: EventCallback) -> ListenerId {
        let mut state = self.state.lock().recover_poison("EventRegistry::register");
        let id = ListenerId(state.next_id);
        state.next_id += 1;
        state.registrations.push(Registration {
            id,
            event,
            callback,
        });
        id
    }

    /// All registrations in registration order.
    pub(crate) fn snapshot(&self) -> Vec<(ListenerId, BridgeEvent, EventCallback)> {
        let state = self.state.lock().recover_poison("EventRegistry::snapshot");
        state
            .registrations
            .iter()
            .map(|r| (r.id, r.event, r.callback.clone()))
            .collect()
    }

    /// Every callback registered for `event`, in registration order.
    pub(crate) fn callbacks_for(&self, event: BridgeEvent) -> Vec<EventCallback> {
        let state = self.state.lock().recover_poison("EventRegistry::callbacks_for");
        state
            .registrations
            .iter()
            .filter(|r| r.event == event)
            .map(|r| r.callback.clone())
            .collect()
    }

    /// The callback of one registration, if it exists and matches `event`.
    pub(crate) fn callback(&self, id: ListenerId, event: BridgeEvent) -> Option<EventCallback> {
        let state = self.state.lock().recover_poison("EventRegistry::callback");
        state
            .registrations
            .iter()
            .find(|r| r.id == id && r.event == event)
            .map(|r| r.callback.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().recover_poison("EventRegistry::len").registrations.len()
    }
}
