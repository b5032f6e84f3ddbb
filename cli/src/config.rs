//! Centralized configuration management.
//!
//! All environment variables are read and validated once at startup. Missing
//! credentials or a bad worker count stop the program before any work begins.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use thiserror::Error;
use tracklift::config::{DEFAULT_DOWNLOAD_ROOT, DEFAULT_LEDGER_FILE, DEFAULT_MAX_WORKERS};
use tracklift::RunConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Spotify client id (required)
    pub spotify_client_id: String,
    /// Spotify client secret (required)
    pub spotify_client_secret: String,
    /// Concurrent downloads per playlist (default: 5)
    pub max_workers: NonZeroUsize,
    /// Playlists to process, in order (default: none)
    pub playlist_urls: Vec<String>,
    /// Root folder for per-playlist download folders
    pub download_root: PathBuf,
    /// JSON ledger of failed tracks
    pub failed_downloads_file: PathBuf,
    /// yt-dlp executable (default: "yt-dlp" from PATH)
    pub ytdlp_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let max_workers = match lookup("MAX_WORKERS") {
            Some(raw) => parse_max_workers(&raw)?,
            None => NonZeroUsize::new(DEFAULT_MAX_WORKERS).unwrap_or(NonZeroUsize::MIN),
        };

        Ok(Self {
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            max_workers,
            playlist_urls: lookup("PLAYLIST_URLS")
                .map(|raw| split_playlist_urls(&raw))
                .unwrap_or_default(),
            download_root: PathBuf::from(
                lookup("DOWNLOAD_ROOT").unwrap_or_else(|| DEFAULT_DOWNLOAD_ROOT.to_string()),
            ),
            failed_downloads_file: PathBuf::from(
                lookup("FAILED_DOWNLOADS_FILE").unwrap_or_else(|| DEFAULT_LEDGER_FILE.to_string()),
            ),
            ytdlp_path: PathBuf::from(lookup("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string())),
        })
    }

    /// Settings handed to the pipeline
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(&self.download_root, &self.failed_downloads_file)
            .with_max_workers(self.max_workers)
    }
}

fn parse_max_workers(raw: &str) -> Result<NonZeroUsize, ConfigError> {
    raw.trim().parse::<NonZeroUsize>().map_err(|_| ConfigError::Invalid {
        key: "MAX_WORKERS",
        value: raw.to_string(),
        reason: "expected a positive integer",
    })
}

/// Splits on commas and newlines, dropping blanks
pub fn split_playlist_urls(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
