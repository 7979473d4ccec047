use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use rondo::access::{AllowList, current_uid};
use rondo::browser::Browser;
use rondo::config::Settings;
use rondo::library::browse::BROWSABLE_ROOT;
use rondo::library::{BrowseEntry, MusicSource, SearchFocus, TrackRecord};
use rondo::logging;
use rondo::runtime::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rondo")]
#[command(about = "Music playback session with a browsable catalog and MPRIS controls", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the player (the default)
    Run {
        /// Music directory to scan instead of the configured catalog
        dir: Option<PathBuf>,
        /// Start playing this track or media id once the catalog is loaded
        #[arg(long)]
        play: Option<String>,
        /// Do not register on the D-Bus session bus
        #[arg(long)]
        no_mpris: bool,
    },
    /// Print the children of a browse node
    Browse {
        /// Node id; the root when omitted
        node: Option<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Search the catalog
    Search {
        /// Free-text query; an empty query lists everything shuffled
        #[arg(default_value = "")]
        query: String,
        #[arg(long, conflicts_with_all = ["album", "genre"])]
        artist: Option<String>,
        #[arg(long, conflicts_with = "genre")]
        album: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (settings, fallback) = runtime::load_settings();
    let _log_guard = logging::init(&settings.logging)?;
    if let Some(reason) = fallback {
        warn!("{reason}");
    }

    match cli.command.unwrap_or(Commands::Run {
        dir: None,
        play: None,
        no_mpris: false,
    }) {
        Commands::Run {
            dir,
            play,
            no_mpris,
        } => runtime::run(
            &settings,
            RunOptions {
                music_dir: dir,
                play,
                mpris: !no_mpris,
            },
        ),
        Commands::Browse { node, dir } => {
            let browser = load_browser(&settings, dir.as_deref())?;
            let node = node.unwrap_or_else(|| BROWSABLE_ROOT.to_string());
            let children = browser
                .try_get_children(&node)
                .context("catalog is not loaded")??;
            for entry in children {
                print_entry(&entry);
            }
            Ok(())
        }
        Commands::Search {
            query,
            artist,
            album,
            genre,
            dir,
        } => {
            let browser = load_browser(&settings, dir.as_deref())?;
            let focus = match (artist, album, genre) {
                (_, Some(album), _) => Some(SearchFocus::Album {
                    album,
                    artist: None,
                }),
                (Some(artist), None, _) => Some(SearchFocus::Artist { artist }),
                (None, None, Some(genre)) => Some(SearchFocus::Genre { genre }),
                (None, None, None) => None,
            };
            let uid = current_uid().unwrap_or(u32::MAX);
            for track in browser.search("rondo", uid, &query, focus.as_ref()) {
                print_track(&track);
            }
            Ok(())
        }
        Commands::PrintConfig => {
            print!("{}", toml::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

/// Load the catalog in the foreground for the one-shot commands.
fn load_browser(settings: &Settings, dir: Option<&Path>) -> anyhow::Result<Arc<Browser>> {
    let Some(loader) = runtime::catalog_loader(settings, dir) else {
        bail!("no catalog configured");
    };
    let source = Arc::new(MusicSource::new());
    source.load(loader.as_ref())?;

    let (_, recent) = runtime::position_stores(settings);
    let authorizer = AllowList::from_settings(&settings.access, current_uid().unwrap_or(u32::MAX));
    Ok(Arc::new(Browser::new(
        source,
        Box::new(authorizer),
        recent,
        settings.access.allow_unknown_search,
    )))
}

fn print_entry(entry: &BrowseEntry) {
    match entry {
        BrowseEntry::Category(item) => println!("{}/\t{}", item.id, item.title),
        BrowseEntry::Track(track) => println!("{}\t{} - {}", track.id, track.artist, track.title),
    }
}

fn print_track(track: &TrackRecord) {
    let duration = if track.has_known_duration() {
        let secs = track.duration_ms / 1000;
        format!("{}:{:02}", secs / 60, secs % 60)
    } else {
        "--:--".to_string()
    };
    println!(
        "{}\t{} - {} ({})\t{duration}",
        track.id, track.artist, track.title, track.album
    );
}
