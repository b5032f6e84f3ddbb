use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Worker cap used when nothing else is configured
pub const DEFAULT_MAX_WORKERS: usize = 5;

pub const DEFAULT_DOWNLOAD_ROOT: &str = "Spotify_Playlists_Downloads";

pub const DEFAULT_LEDGER_FILE: &str = "failed_downloads.json";

/// Settings for one pipeline run. Built once at startup and handed to the
/// runner; nothing below reads the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// One subdirectory per playlist is created below this
    pub download_root: PathBuf,
    /// Maximum acquisitions in flight per playlist batch
    pub max_workers: NonZeroUsize,
    /// JSON file that failed tracks are merged into
    pub ledger_path: PathBuf,
}

impl RunConfig {
    pub fn new(download_root: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
            ledger_path: ledger_path.into(),
            ..Default::default()
        }
    }

    pub fn with_max_workers(mut self, max_workers: NonZeroUsize) -> Self {
        self.max_workers = max_workers;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from(DEFAULT_DOWNLOAD_ROOT),
            max_workers: NonZeroUsize::new(DEFAULT_MAX_WORKERS).unwrap_or(NonZeroUsize::MIN),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
        }
    }
}
