//! Typed access to `music.player`.

use crate::bridge::{Bridge, DecodeStrategy, Pending};
use crate::domain::{MediaItem, PlaybackState, RepeatMode, ShuffleMode};
use crate::error::BridgeResult;

const PLAYER: &str = "music.player";

/// Playback controls and state of the runtime's player.
#[derive(Clone)]
pub struct Player {
    bridge: Bridge,
}

impl Player {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    fn read<T>(&self, property: &str, strategy: DecodeStrategy) -> Pending<T>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        self.bridge
            .value(&format!("{PLAYER}.{property}"), strategy)
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    /// Duration of the current item in seconds.
    pub fn current_playback_duration(&self) -> Pending<f64> {
        self.read("currentPlaybackDuration", DecodeStrategy::Primitive)
    }

    /// Progress through the current item, `0.0..=1.0`.
    pub fn current_playback_progress(&self) -> Pending<f64> {
        self.read("currentPlaybackProgress", DecodeStrategy::Primitive)
    }

    pub fn current_playback_time(&self) -> Pending<f64> {
        self.read("currentPlaybackTime", DecodeStrategy::Primitive)
    }

    pub fn current_playback_time_remaining(&self) -> Pending<f64> {
        self.read("currentPlaybackTimeRemaining", DecodeStrategy::Primitive)
    }

    pub fn is_playing(&self) -> Pending<bool> {
        self.read("isPlaying", DecodeStrategy::Primitive)
    }

    /// The item being played, `None` when the queue has not started.
    pub fn now_playing_item(&self) -> Pending<Option<MediaItem>> {
        self.bridge.value(
            &format!("JSON.stringify({PLAYER}.nowPlayingItem)"),
            DecodeStrategy::JsonText,
        )
    }

    pub fn now_playing_item_index(&self) -> Pending<i64> {
        self.read("nowPlayingItemIndex", DecodeStrategy::Primitive)
    }

    pub fn playback_state(&self) -> Pending<PlaybackState> {
        self.read("playbackState", DecodeStrategy::EnumFromPrimitive)
    }

    pub fn repeat_mode(&self) -> Pending<RepeatMode> {
        self.read("repeatMode", DecodeStrategy::EnumFromPrimitive)
    }

    pub fn shuffle_mode(&self) -> Pending<ShuffleMode> {
        self.read("shuffleMode", DecodeStrategy::EnumFromPrimitive)
    }

    pub fn volume(&self) -> Pending<f64> {
        self.read("volume", DecodeStrategy::Primitive)
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    pub fn play(&self) -> Pending<()> {
        self.bridge.run(&format!("{PLAYER}.play()"))
    }

    pub fn pause(&self) -> Pending<()> {
        self.bridge.run(&format!("{PLAYER}.pause()"))
    }

    pub fn stop(&self) -> Pending<()> {
        self.bridge.run(&format!("{PLAYER}.stop()"))
    }

    pub fn mute(&self) -> Pending<()> {
        self.bridge.run(&format!("{PLAYER}.mute()"))
    }

    /// Pause when playing, play when paused, stopped or ended.
    ///
    /// Any other state (loading, seeking, waiting, ...) is left alone.
    pub async fn toggle_play_pause(&self) -> BridgeResult<()> {
        let state = self.playback_state().await?;
        if state == PlaybackState::Playing {
            self.pause().await
        } else if state.is_resumable() {
            self.play().await
        } else {
            log::debug!(
                target: "musicbridge::player",
                "Ignoring play/pause toggle in state {:?}",
                state
            );
            Ok(())
        }
    }

    pub fn seek_to_time(&self, seconds: f64) -> Pending<()> {
        self.bridge
            .promise(&format!("{PLAYER}.seekToTime({seconds})"))
    }

    /// Skip to the next item; resolves to the new index when the runtime
    /// reports one.
    pub fn skip_to_next_item(&self) -> Pending<Option<i64>> {
        self.bridge.promise_value(
            &format!("{PLAYER}.skipToNextItem()"),
            DecodeStrategy::Primitive,
        )
    }

    pub fn skip_to_previous_item(&self) -> Pending<Option<i64>> {
        self.bridge.promise_value(
            &format!("{PLAYER}.skipToPreviousItem()"),
            DecodeStrategy::Primitive,
        )
    }

    /// Jump to the item at absolute queue index `index`.
    pub fn change_to_media_at_index(&self, index: usize) -> Pending<()> {
        self.bridge
            .promise(&format!("{PLAYER}.changeToMediaAtIndex({index})"))
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Pending<()> {
        self.bridge
            .run(&format!("{PLAYER}.repeatMode = {}", i64::from(mode)))
    }

    pub fn set_shuffle_mode(&self, mode: ShuffleMode) -> Pending<()> {
        self.bridge
            .run(&format!("{PLAYER}.shuffleMode = {}", i64::from(mode)))
    }

    /// Set the volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f64) -> Pending<()> {
        let volume = volume.clamp(0.0, 1.0);
        self.bridge.run(&format!("{PLAYER}.volume = {volume}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingChannel;
    use serde_json::json;
    use std::sync::Arc;

    fn player_with(value: serde_json::Value) -> (Arc<RecordingChannel>, Player) {
        let channel = Arc::new(RecordingChannel::with_responder(move |_| {
            Some(Ok(value.clone()))
        }));
        (channel.clone(), Player::new(Bridge::new(channel)))
    }

    #[tokio::test]
    async fn playback_state_decodes_from_number() {
        let (channel, player) = player_with(json!(2));
        assert_eq!(player.playback_state().await.unwrap(), PlaybackState::Playing);
        assert_eq!(channel.executed(), vec!["music.player.playbackState"]);
    }

    #[tokio::test]
    async fn missing_now_playing_item_is_none() {
        let (channel, player) = player_with(json!("null"));
        assert_eq!(player.now_playing_item().await.unwrap(), None);
        assert_eq!(
            channel.executed(),
            vec!["JSON.stringify(music.player.nowPlayingItem)"]
        );
    }

    #[tokio::test]
    async fn toggle_pauses_while_playing() {
        let (channel, player) = player_with(json!(2));
        player.toggle_play_pause().await.unwrap();
        assert_eq!(channel.executed().last().unwrap(), "music.player.pause()");
    }

    #[tokio::test]
    async fn toggle_plays_when_stopped() {
        let (channel, player) = player_with(json!(4));
        player.toggle_play_pause().await.unwrap();
        assert_eq!(channel.executed().last().unwrap(), "music.player.play()");
    }

    #[tokio::test]
    async fn toggle_ignores_loading() {
        let (channel, player) = player_with(json!(1));
        player.toggle_play_pause().await.unwrap();
        assert_eq!(channel.executed().len(), 1);
    }

    #[tokio::test]
    async fn setters_write_raw_values() {
        let (channel, player) = player_with(json!(null));
        player.set_repeat_mode(RepeatMode::All).await.unwrap();
        player.set_volume(1.5).await.unwrap();
        assert_eq!(
            channel.executed(),
            vec!["music.player.repeatMode = 2", "music.player.volume = 1"]
        );
    }
}
