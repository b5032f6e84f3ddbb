use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Download Spotify playlists as MP3s found through YouTube search.
#[derive(Debug, Parser)]
#[command(name = "tracklift", version, about)]
pub struct Args {
    /// Playlist URLs, URIs or IDs. Overrides PLAYLIST_URLS when given.
    #[arg(value_name = "PLAYLIST")]
    pub playlists: Vec<String>,

    /// Maximum concurrent downloads per playlist. Overrides MAX_WORKERS.
    #[arg(short = 'j', long)]
    pub max_workers: Option<NonZeroUsize>,

    /// Ask for a playlist URL on stdin
    #[arg(long, conflicts_with = "retry_failed")]
    pub prompt: bool,

    /// Re-attempt the tracks recorded in the failed downloads file
    #[arg(long)]
    pub retry_failed: bool,

    /// File that warnings and errors are appended to
    #[arg(long, env = "LOG_FILE", default_value = "tracklift.log")]
    pub log_file: PathBuf,
}
