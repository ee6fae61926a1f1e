//! Entry point to the SDK: configuration, authorization and queue setup.

use std::sync::Arc;

use super::library::CloudLibrary;
use super::player::Player;
use super::queue::Queue;
use crate::bridge::script::{js_array, js_string};
use crate::bridge::{Bridge, DecodeStrategy, ErrorHandler, Pending, ScriptChannel};
use crate::catalog::Credentials;
use crate::config::{BridgeSettings, ConfigResult, SettingsStore};
use crate::domain::MediaId;
use crate::error::{BridgeError, BridgeResult};
use crate::queue::QueueReconciler;

const LOG_TARGET: &str = "musicbridge::bridge";

/// What to replace the playback queue with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSource {
    /// A catalog or share URL.
    Url(String),
    Song(MediaId),
    Songs(Vec<MediaId>),
    Album(MediaId),
    Playlist(MediaId),
}

impl QueueSource {
    /// The `setQueue` call that loads this source.
    pub fn fragment(&self) -> String {
        let descriptor = match self {
            QueueSource::Url(url) => format!("url: {}", js_string(url)),
            QueueSource::Song(id) => format!("song: {}", js_string(id)),
            QueueSource::Songs(ids) => format!("songs: {}", js_array(ids)),
            QueueSource::Album(id) => format!("album: {}", js_string(id)),
            QueueSource::Playlist(id) => format!("playlist: {}", js_string(id)),
        };
        format!("music.setQueue({{ {descriptor} }})")
    }
}

/// One runtime connection with its typed surface.
///
/// Construct once and share; there is no global instance. The queue
/// reconciler is attached on construction and starts mirroring the queue as
/// soon as the runtime reports ready.
pub struct MusicContext {
    bridge: Bridge,
    settings: SettingsStore,
    player: Player,
    queue: Queue,
    library: CloudLibrary,
    reconciler: Arc<QueueReconciler<Queue>>,
}

impl MusicContext {
    /// Build a context over `channel`.
    ///
    /// Fails only if the settings carry an out-of-range load timeout. Build it
    /// inside a tokio runtime: the load watchdog and queue reloads run there.
    pub fn new(channel: Arc<dyn ScriptChannel>, settings: BridgeSettings) -> ConfigResult<Self> {
        let bridge = Bridge::with_load_timeout(channel, settings.load_timeout()?);
        bridge.set_enhanced_error_logging(settings.enhanced_error_logging());

        let player = Player::new(bridge.clone());
        let queue = Queue::new(bridge.clone());
        let library = CloudLibrary::new(bridge.clone());
        let reconciler = Arc::new(QueueReconciler::new(queue.clone()));
        reconciler.attach(&bridge);

        Ok(Self {
            bridge,
            settings: SettingsStore::new(settings),
            player,
            queue,
            library,
            reconciler,
        })
    }

    /// The bridge every typed call goes through.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Albums and playlists of the signed-in user.
    pub fn library(&self) -> &CloudLibrary {
        &self.library
    }

    /// Local mirror of the playback queue.
    pub fn reconciler(&self) -> &Arc<QueueReconciler<Queue>> {
        &self.reconciler
    }

    /// Settings currently in effect.
    pub fn settings(&self) -> Arc<BridgeSettings> {
        self.settings.load()
    }

    /// Swap in new settings.
    ///
    /// Error logging switches immediately. The page-related fields apply to
    /// the next load; the load timeout is fixed for the life of the context.
    pub fn apply_settings(&self, settings: BridgeSettings) {
        self.bridge
            .set_enhanced_error_logging(settings.enhanced_error_logging());
        if settings.load_timeout_secs != self.settings.load().load_timeout_secs {
            log::warn!(
                target: LOG_TARGET,
                "Load timeout changes apply to new contexts only"
            );
        }
        self.settings.store(settings);
    }

    /// Start loading the runtime page described by the current settings.
    ///
    /// Load failures and the watchdog timeout go to `on_error`.
    pub fn load(&self, on_error: ErrorHandler) -> ConfigResult<()> {
        let page = self.settings.load().page_request()?;
        self.bridge.load(&page, on_error);
        Ok(())
    }

    /// Load the runtime, wait until that load is ready, and fetch the tokens
    /// the catalog needs.
    ///
    /// Calling this again reloads the page; it resolves only once the new
    /// load succeeds, and its timeout or loading error is returned here.
    pub async fn configure(&self) -> BridgeResult<Credentials> {
        let page = self
            .settings
            .load()
            .page_request()
            .map_err(|e| BridgeError::loading_failed(e.to_string()))?;

        self.bridge.load_until_ready(&page).await?;
        log::info!(target: LOG_TARGET, "Runtime ready");
        self.credentials().await
    }

    /// Developer and user token, as the runtime currently holds them.
    pub async fn credentials(&self) -> BridgeResult<Credentials> {
        let (developer_token, user_token) = tokio::join!(self.developer_token(), self.user_token());
        Ok(Credentials {
            developer_token: developer_token?,
            user_token: user_token?,
        })
    }

    /// Ask the user to sign in; resolves to the music user token.
    pub fn authorize(&self) -> Pending<String> {
        self.bridge
            .promise_value("music.authorize()", DecodeStrategy::Primitive)
    }

    /// Sign the user out; the user token is cleared.
    pub fn unauthorize(&self) -> Pending<()> {
        self.bridge.promise("music.unauthorize()")
    }

    pub fn is_authorized(&self) -> Pending<bool> {
        self.bridge
            .value("music.isAuthorized", DecodeStrategy::Primitive)
    }

    /// The developer token the runtime was configured with.
    pub fn developer_token(&self) -> Pending<String> {
        self.bridge
            .value("music.developerToken", DecodeStrategy::Primitive)
    }

    /// The music user token, `None` while nobody is signed in.
    pub fn user_token(&self) -> Pending<Option<String>> {
        // undefined does not survive the boundary; coerce it to null first
        self.bridge.value(
            "JSON.stringify(music.musicUserToken !== undefined ? music.musicUserToken : null)",
            DecodeStrategy::JsonText,
        )
    }

    /// Replace the playback queue.
    pub fn set_queue(&self, source: &QueueSource) -> Pending<()> {
        self.bridge.promise(&source.fragment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::LoadState;
    use crate::testing::RecordingChannel;
    use serde_json::json;

    fn settings() -> BridgeSettings {
        BridgeSettings {
            developer_token: Some("dev-token".to_string()),
            app_url: Some("https://app.example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn queue_sources_render_set_queue_calls() {
        assert_eq!(
            QueueSource::Playlist("pl.123".to_string()).fragment(),
            "music.setQueue({ playlist: \"pl.123\" })"
        );
        assert_eq!(
            QueueSource::Songs(vec!["1".to_string(), "2".to_string()]).fragment(),
            "music.setQueue({ songs: [\"1\",\"2\"] })"
        );
    }

    #[tokio::test]
    async fn user_token_null_means_signed_out() {
        let channel = Arc::new(RecordingChannel::with_responder(|_| Some(Ok(json!("null")))));
        let context = MusicContext::new(channel, settings()).unwrap();
        assert_eq!(context.user_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn configure_waits_for_ready_then_reads_tokens() {
        let channel = token_channel();
        let context = Arc::new(MusicContext::new(channel.clone(), settings()).unwrap());

        let configuring = {
            let context = context.clone();
            tokio::spawn(async move { context.configure().await })
        };
        while channel.loads().is_empty() {
            tokio::task::yield_now().await;
        }
        context
            .bridge()
            .handle_message("runtimeLoaded", json!(""));

        let credentials = configuring.await.unwrap().unwrap();
        assert_eq!(credentials.developer_token, "dev-token");
        assert_eq!(credentials.user_token.as_deref(), Some("user-token"));
        assert_eq!(context.bridge().load_state(), LoadState::Loaded);
    }

    fn token_channel() -> Arc<RecordingChannel> {
        Arc::new(RecordingChannel::with_responder(|source| {
            if source == "music.developerToken" {
                Some(Ok(json!("dev-token")))
            } else if source.contains("musicUserToken") {
                Some(Ok(json!("\"user-token\"")))
            } else {
                None
            }
        }))
    }

    #[tokio::test]
    async fn second_configure_waits_for_its_own_load() {
        let channel = token_channel();
        let context = Arc::new(MusicContext::new(channel.clone(), settings()).unwrap());

        let first = {
            let context = context.clone();
            tokio::spawn(async move { context.configure().await })
        };
        while channel.loads().is_empty() {
            tokio::task::yield_now().await;
        }
        context.bridge().handle_message("runtimeLoaded", json!(""));
        first.await.unwrap().unwrap();
        let listeners = context.bridge().listener_count();

        let second = {
            let context = context.clone();
            tokio::spawn(async move { context.configure().await })
        };
        while channel.loads().len() < 2 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!second.is_finished());
        assert_eq!(context.bridge().load_state(), LoadState::Loading);

        context.bridge().handle_message("runtimeLoaded", json!(""));
        let credentials = second.await.unwrap().unwrap();
        assert_eq!(credentials.developer_token, "dev-token");
        assert_eq!(context.bridge().listener_count(), listeners);
    }

    #[tokio::test]
    async fn configure_surfaces_loading_error_of_its_load() {
        let channel = token_channel();
        let context = Arc::new(MusicContext::new(channel.clone(), settings()).unwrap());

        let configuring = {
            let context = context.clone();
            tokio::spawn(async move { context.configure().await })
        };
        while channel.loads().is_empty() {
            tokio::task::yield_now().await;
        }
        context
            .bridge()
            .handle_message("throwLoadingError", json!("Error loading MusicKit JS"));

        assert!(matches!(
            configuring.await.unwrap(),
            Err(BridgeError::LoadingFailed { .. })
        ));
    }

    #[tokio::test]
    async fn configure_without_app_url_fails_before_loading() {
        let channel = Arc::new(RecordingChannel::new());
        let context = MusicContext::new(channel.clone(), BridgeSettings::default()).unwrap();

        let error = context.configure().await.unwrap_err();

        assert!(matches!(error, BridgeError::LoadingFailed { .. }));
        assert!(channel.loads().is_empty());
    }
}
