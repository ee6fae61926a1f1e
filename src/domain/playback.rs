//! Integer-represented player enums.
//!
//! The runtime reports these as bare integers. Each enum converts from `i64`
//! through `TryFrom`, which serde uses for decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An integer the runtime reported does not name a known case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{value} is not a valid {kind}")]
pub struct UnknownCase {
    pub kind: &'static str,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PlaybackState {
    None,
    Loading,
    Playing,
    Paused,
    Stopped,
    Ended,
    Seeking,
    Waiting,
    Stalled,
    Completed,
}

impl PlaybackState {
    /// Whether `play` should resume from this state.
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            PlaybackState::Paused | PlaybackState::Stopped | PlaybackState::Ended
        )
    }
}

impl TryFrom<i64> for PlaybackState {
    type Error = UnknownCase;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PlaybackState::None,
            1 => PlaybackState::Loading,
            2 => PlaybackState::Playing,
            3 => PlaybackState::Paused,
            4 => PlaybackState::Stopped,
            5 => PlaybackState::Ended,
            6 => PlaybackState::Seeking,
            // 7 is unused by the SDK
            8 => PlaybackState::Waiting,
            9 => PlaybackState::Stalled,
            10 => PlaybackState::Completed,
            _ => {
                return Err(UnknownCase {
                    kind: "playback state",
                    value,
                });
            }
        })
    }
}

impl From<PlaybackState> for i64 {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::None => 0,
            PlaybackState::Loading => 1,
            PlaybackState::Playing => 2,
            PlaybackState::Paused => 3,
            PlaybackState::Stopped => 4,
            PlaybackState::Ended => 5,
            PlaybackState::Seeking => 6,
            PlaybackState::Waiting => 8,
            PlaybackState::Stalled => 9,
            PlaybackState::Completed => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RepeatMode {
    None,
    /// Repeat the current item.
    One,
    /// Repeat the whole queue.
    All,
}

impl TryFrom<i64> for RepeatMode {
    type Error = UnknownCase;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RepeatMode::None),
            1 => Ok(RepeatMode::One),
            2 => Ok(RepeatMode::All),
            _ => Err(UnknownCase {
                kind: "repeat mode",
                value,
            }),
        }
    }
}

impl From<RepeatMode> for i64 {
    fn from(mode: RepeatMode) -> Self {
        match mode {
            RepeatMode::None => 0,
            RepeatMode::One => 1,
            RepeatMode::All => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ShuffleMode {
    Off,
    /// The SDK calls this mode `songs`.
    Shuffle,
}

impl TryFrom<i64> for ShuffleMode {
    type Error = UnknownCase;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShuffleMode::Off),
            1 => Ok(ShuffleMode::Shuffle),
            _ => Err(UnknownCase {
                kind: "shuffle mode",
                value,
            }),
        }
    }
}

impl From<ShuffleMode> for i64 {
    fn from(mode: ShuffleMode) -> Self {
        match mode {
            ShuffleMode::Off => 0,
            ShuffleMode::Shuffle => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn playback_state_skips_unused_seven() {
        assert_eq!(PlaybackState::try_from(8), Ok(PlaybackState::Waiting));
        assert!(PlaybackState::try_from(7).is_err());
    }

    #[test]
    fn playback_state_converts_both_ways() {
        for raw in [0, 1, 2, 3, 4, 5, 6, 8, 9, 10] {
            let state = PlaybackState::try_from(raw).unwrap();
            assert_eq!(i64::from(state), raw);
        }
    }

    #[test]
    fn modes_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&RepeatMode::All).unwrap(), "2");
        assert_eq!(serde_json::to_string(&ShuffleMode::Shuffle).unwrap(), "1");
    }

    #[test]
    fn unknown_case_names_the_enum() {
        let error = RepeatMode::try_from(5).unwrap_err();
        assert_eq!(error.to_string(), "5 is not a valid repeat mode");
    }

    #[rstest]
    #[case::paused(PlaybackState::Paused, true)]
    #[case::stopped(PlaybackState::Stopped, true)]
    #[case::ended(PlaybackState::Ended, true)]
    #[case::playing(PlaybackState::Playing, false)]
    #[case::loading(PlaybackState::Loading, false)]
    #[case::seeking(PlaybackState::Seeking, false)]
    fn resumable_states(#[case] state: PlaybackState, #[case] expected: bool) {
        assert_eq!(state.is_resumable(), expected);
    }
}
