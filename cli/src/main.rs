mod args;
mod config;
mod logging;

use clap::Parser;
use std::process::ExitCode;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracklift::{
    spotify::SpotifyClientBuilder, ytdlp::YtDlpFetcher, AudioFetcher, PlaylistRunner,
    ServicesBuilder,
};

use crate::{args::Args, config::AppConfig};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let _guard = logging::init(&args.log_file);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("downloader")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Could not start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}. Exiting.", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }

    let mut playlist_urls = if args.playlists.is_empty() {
        config.playlist_urls.clone()
    } else {
        args.playlists.clone()
    };
    if args.prompt {
        match prompt_playlist_url().await? {
            Some(url) => playlist_urls.push(url),
            None => warn!("No playlist URL provided by user."),
        }
    }

    let catalog = SpotifyClientBuilder::new()
        .client_id(&config.spotify_client_id)
        .client_secret(&config.spotify_client_secret)
        .build()?;
    let fetcher = YtDlpFetcher::new(&config.ytdlp_path);
    if !fetcher.health_check().await {
        warn!(
            "{} was not found on PATH; every download will fail until it is installed",
            fetcher.binary().display()
        );
    }

    let services = ServicesBuilder::new()
        .catalog(catalog)
        .fetcher(fetcher)
        .build()?;
    for (id, name) in services.describe() {
        info!("Using {} ({})", name, id);
    }

    let runner = PlaylistRunner::new(services, config.run_config());
    let summary = if args.retry_failed {
        runner.retry_failed().await
    } else {
        runner.run(&playlist_urls).await
    };

    if !summary.playlists.is_empty() {
        info!(
            "MP3s saved in: {}",
            std::path::absolute(&runner.config().download_root)
                .unwrap_or_else(|_| runner.config().download_root.clone())
                .display()
        );
    }
    Ok(())
}

async fn prompt_playlist_url() -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.write_all(b"Enter Spotify Playlist URL or ID: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(io::stdin()).read_line(&mut line).await?;
    let url = line.trim();
    Ok((!url.is_empty()).then(|| url.to_string()))
}
