use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};
use musicbridge::api::{MusicContext, QueueSource, SongKind};
use musicbridge::bridge::{BridgeEvent, EvalCompletion, PageRequest, ScriptChannel};
use musicbridge::catalog::{Credentials, HttpCatalog, Library};
use musicbridge::config::{self, BridgeSettings};
use musicbridge::domain::{RepeatMode, ShuffleMode};
use musicbridge::queue::QueueRemote;

/// Inspect and exercise the music runtime bridge from the command line
#[derive(Parser)]
#[command(name = "musicbridge")]
#[command(version)]
#[command(about = "Inspect and exercise the music runtime bridge from the command line")]
struct Cli {
    /// Settings file layered over the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Settings given on the command line; these win over every file.
#[derive(Args)]
struct Overrides {
    #[arg(long, global = true)]
    developer_token: Option<String>,

    #[arg(long, global = true)]
    app_url: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,
}

impl Overrides {
    fn into_settings(self) -> Option<BridgeSettings> {
        if self.developer_token.is_none() && self.app_url.is_none() && self.log_level.is_none() {
            return None;
        }
        Some(BridgeSettings {
            developer_token: self.developer_token,
            app_url: self.app_url,
            log_level: self.log_level,
            ..Default::default()
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved settings as TOML
    Config,
    /// Print the script a bridge operation would inject into the runtime
    Script {
        #[command(subcommand)]
        operation: Operation,
    },
    /// Query the signed-in user's cloud library
    Library {
        /// Music user token for endpoints that need a signed-in user
        #[arg(long)]
        user_token: Option<String>,

        #[command(subcommand)]
        query: LibraryQuery,
    },
}

#[derive(Subcommand)]
enum Operation {
    Authorize,
    Unauthorize,
    Play,
    Pause,
    Stop,
    /// Seek to a position in seconds
    Seek { seconds: f64 },
    SkipNext,
    SkipPrevious,
    /// Repeat mode: 0 (none), 1 (one) or 2 (all)
    Repeat { mode: i64 },
    /// Shuffle mode: 0 (off) or 1 (shuffle)
    Shuffle { mode: i64 },
    Volume { level: f64 },
    /// Replace the queue with a playlist
    QueuePlaylist { id: String },
    /// Replace the queue with an album
    QueueAlbum { id: String },
    /// Replace the queue with songs
    QueueSongs { ids: Vec<String> },
    /// Replace the queue from a URL
    QueueUrl { url: String },
    /// Append songs to the queue
    Append {
        ids: Vec<String>,
        #[arg(long)]
        library: bool,
    },
    /// Remove items at absolute queue indexes
    Remove { indexes: Vec<usize> },
    /// Fetch library albums by id, or a page of them when no id is given
    Albums {
        ids: Vec<String>,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Fetch library playlists by id, or a page of them when no id is given
    Playlists {
        ids: Vec<String>,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Attach a listener for a runtime event (e.g. playbackStateDidChange)
    Listen { event: String },
}

#[derive(Subcommand)]
enum LibraryQuery {
    Song { id: String },
    Songs { ids: Vec<String> },
    Page {
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Tracks of a library playlist
    PlaylistTracks {
        id: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

/// Collects injected scripts instead of evaluating them.
#[derive(Default)]
struct PreviewChannel {
    executed: Mutex<Vec<String>>,
}

impl PreviewChannel {
    fn executed(&self) -> Vec<String> {
        self.scripts().clone()
    }

    fn clear(&self) {
        self.scripts().clear();
    }

    fn scripts(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.executed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ScriptChannel for PreviewChannel {
    fn execute(&self, source: &str, _completion: Option<EvalCompletion>) {
        self.scripts().push(source.to_string());
    }

    fn register_channel(&self, _name: &str) {}

    fn unregister_channel(&self, _name: &str) {}

    fn load(&self, _page: &PageRequest) {}
}

fn main() {
    let cli = Cli::parse();

    let settings = resolve_settings(cli.config.as_deref(), cli.overrides.into_settings())
        .unwrap_or_else(|e| fail(&e.to_string()));

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level()),
    )
    .init();

    match cli.command {
        Commands::Config => match settings.to_toml_string() {
            Ok(rendered) => print!("{}", rendered),
            Err(e) => fail(&e.to_string()),
        },
        Commands::Script { operation } => {
            for script in preview(settings, operation) {
                println!("{}", script);
            }
        }
        Commands::Library { user_token, query } => {
            if let Err(e) = query_library(&settings, user_token, query) {
                fail(&e.to_string());
            }
        }
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn resolve_settings(
    path: Option<&std::path::Path>,
    overrides: Option<BridgeSettings>,
) -> config::ConfigResult<BridgeSettings> {
    let user = config::load_user_config()?;
    let explicit = path.map(BridgeSettings::load_from_path).transpose()?;
    Ok(config::merge_all(&[user, explicit, overrides]).unwrap_or_default())
}

/// Run `operation` against a recording channel and return what it injected.
fn preview(settings: BridgeSettings, operation: Operation) -> Vec<String> {
    let channel = Arc::new(PreviewChannel::default());
    let context = MusicContext::new(channel.clone(), settings).unwrap_or_else(|e| fail(&e.to_string()));
    let player = context.player();

    // Results are never awaited; only the injected scripts matter here.
    match operation {
        Operation::Authorize => drop(context.authorize()),
        Operation::Unauthorize => drop(context.unauthorize()),
        Operation::Play => drop(player.play()),
        Operation::Pause => drop(player.pause()),
        Operation::Stop => drop(player.stop()),
        Operation::Seek { seconds } => drop(player.seek_to_time(seconds)),
        Operation::SkipNext => drop(player.skip_to_next_item()),
        Operation::SkipPrevious => drop(player.skip_to_previous_item()),
        Operation::Repeat { mode } => match RepeatMode::try_from(mode) {
            Ok(mode) => drop(player.set_repeat_mode(mode)),
            Err(e) => fail(&e.to_string()),
        },
        Operation::Shuffle { mode } => match ShuffleMode::try_from(mode) {
            Ok(mode) => drop(player.set_shuffle_mode(mode)),
            Err(e) => fail(&e.to_string()),
        },
        Operation::Volume { level } => drop(player.set_volume(level)),
        Operation::QueuePlaylist { id } => drop(context.set_queue(&QueueSource::Playlist(id))),
        Operation::QueueAlbum { id } => drop(context.set_queue(&QueueSource::Album(id))),
        Operation::QueueSongs { ids } => drop(context.set_queue(&QueueSource::Songs(ids))),
        Operation::QueueUrl { url } => drop(context.set_queue(&QueueSource::Url(url))),
        Operation::Append { ids, library } => {
            let kind = if library { SongKind::Library } else { SongKind::Catalog };
            drop(context.queue().append_songs(&ids, kind));
        }
        Operation::Remove { indexes } => match indexes.as_slice() {
            [index] => drop(context.queue().remove(*index)),
            _ => drop(context.queue().remove_many(&indexes.into_iter().collect())),
        },
        Operation::Albums { ids, limit, offset } => {
            if ids.is_empty() {
                drop(context.library().albums_page(limit, offset));
            } else {
                drop(context.library().albums(&ids));
            }
        }
        Operation::Playlists { ids, limit, offset } => {
            if ids.is_empty() {
                drop(context.library().playlists_page(limit, offset));
            } else {
                drop(context.library().playlists(&ids));
            }
        }
        Operation::Listen { event } => {
            let event = BridgeEvent::from_str(&event).unwrap_or_else(|e| fail(&e.to_string()));
            context.bridge().handle_message("runtimeLoaded", serde_json::Value::Null);
            channel.clear();
            context.bridge().add_event_listener(event, || {});
        }
    }
    channel.executed()
}

fn query_library(
    settings: &BridgeSettings,
    user_token: Option<String>,
    query: LibraryQuery,
) -> Result<(), Box<dyn std::error::Error>> {
    let developer_token = settings
        .developer_token
        .clone()
        .ok_or(config::ConfigError::MissingField("developer_token"))?;
    let catalog = HttpCatalog::new(
        settings.catalog_url()?,
        Credentials {
            developer_token,
            user_token,
        },
    )?;
    let library = Library::new(catalog);

    let rendered = match query {
        LibraryQuery::Song { id } => serde_json::to_string_pretty(&library.song(&id)?)?,
        LibraryQuery::Songs { ids } => serde_json::to_string_pretty(&library.songs(&ids)?)?,
        LibraryQuery::Page { limit, offset } => {
            render_page(library.songs_page(limit, offset)?)?
        }
        LibraryQuery::PlaylistTracks { id, limit, offset } => {
            render_page(library.playlist_songs(&id, limit, offset)?)?
        }
    };
    println!("{}", rendered);
    Ok(())
}

fn render_page(
    (songs, meta): (Vec<musicbridge::domain::Song>, Option<musicbridge::catalog::Meta>),
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({ "data": songs, "meta": meta }))
}
