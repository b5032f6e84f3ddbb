use shared::download::{PlaylistRunResult, RunSummary};
use shared::playlist::TrackDescriptor;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::ledger::{FailureLedger, LedgerContents};
use crate::sanitize::safe_folder_name;
use crate::scheduler::BatchScheduler;
use crate::services::Services;
use crate::worker::AcquisitionWorker;

/// Drives whole runs: resolves each playlist, downloads it in a bounded batch
/// and records every failure in the ledger once all batches are done.
pub struct PlaylistRunner {
    services: Services,
    config: RunConfig,
    scheduler: BatchScheduler,
    ledger: FailureLedger,
}

impl PlaylistRunner {
    pub fn new(services: Services, config: RunConfig) -> Self {
        let worker = AcquisitionWorker::new(services.fetcher().clone());
        let ledger = FailureLedger::new(config.ledger_path.clone());
        Self {
            services,
            config,
            scheduler: BatchScheduler::new(worker),
            ledger,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self, playlist_refs: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();
        if playlist_refs.is_empty() {
            warn!("No playlist URLs provided. Nothing to do.");
            return summary;
        }

        for playlist_ref in playlist_refs {
            info!("Fetching playlist details for: {}", playlist_ref);
            let playlist = match self.services.catalog().resolve(playlist_ref).await {
                Ok(playlist) if !playlist.tracks.is_empty() => playlist,
                Ok(playlist) => {
                    error!(
                        "No tracks found in playlist '{}' ({}). Skipping.",
                        playlist.name, playlist_ref
                    );
                    summary.skipped_playlists.push(playlist_ref.clone());
                    continue;
                }
                Err(e) => {
                    error!(
                        "Error fetching playlist details for {}: {}. Skipping.",
                        playlist_ref, e
                    );
                    summary.skipped_playlists.push(playlist_ref.clone());
                    continue;
                }
            };

            let result = self.run_playlist(&playlist.name, &playlist.tracks).await;
            log_playlist_summary(&result);
            summary.playlists.push(result);
        }

        let failures: Vec<TrackDescriptor> = summary.failed_descriptors().cloned().collect();
        if !failures.is_empty() {
            warn!(
                "{} track(s) failed. Details saved to '{}'.",
                failures.len(),
                self.ledger.path().display()
            );
            summary.ledger_written = self.ledger.merge_and_write(&failures).await;
        }

        log_run_summary(&summary);
        summary
    }

    /// Re-attempts every track recorded in the ledger, then rewrites the
    /// ledger with only the tracks that failed again.
    pub async fn retry_failed(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let LedgerContents { tracks, foreign } = self.ledger.load().await;
        if tracks.is_empty() {
            info!("No failed tracks recorded in {}", self.ledger.path().display());
            return summary;
        }

        let groups = group_by_playlist(tracks);
        info!(
            "Retrying failed tracks from {} playlist(s)",
            groups.len()
        );
        for (playlist_name, tracks) in groups {
            let result = self.run_playlist(&playlist_name, &tracks).await;
            log_playlist_summary(&result);
            summary.playlists.push(result);
        }

        let remaining = LedgerContents {
            tracks: summary.failed_descriptors().cloned().collect(),
            foreign,
        };
        summary.ledger_written = self.ledger.replace(&remaining).await;

        log_run_summary(&summary);
        summary
    }

    async fn run_playlist(&self, playlist_name: &str, tracks: &[TrackDescriptor]) -> PlaylistRunResult {
        let folder = safe_folder_name(playlist_name);
        let target_dir: PathBuf = self.config.download_root.join(&folder);
        info!("Playlist: '{}' (Saving to folder: '{}')", playlist_name, folder);

        if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
            error!(
                "Could not create download folder {}: {}. Marking {} track(s) as failed.",
                target_dir.display(),
                e,
                tracks.len()
            );
            return PlaylistRunResult {
                playlist_name: playlist_name.to_string(),
                succeeded: 0,
                failed: tracks.len(),
                failed_descriptors: tracks.to_vec(),
            };
        }

        self.scheduler
            .run_batch(playlist_name, tracks, &target_dir, self.config.max_workers)
            .await
    }
}

/// Groups by `playlist_attempted` in first-seen order, dropping exact duplicates
fn group_by_playlist(tracks: Vec<TrackDescriptor>) -> Vec<(String, Vec<TrackDescriptor>)> {
    let mut seen = HashSet::new();
    let mut groups: Vec<(String, Vec<TrackDescriptor>)> = Vec::new();
    for track in tracks {
        if !seen.insert(track.clone()) {
            continue;
        }
        match groups.iter_mut().find(|(name, _)| *name == track.playlist_attempted) {
            Some((_, group)) => group.push(track),
            None => groups.push((track.playlist_attempted.clone(), vec![track])),
        }
    }
    groups
}

fn log_playlist_summary(result: &PlaylistRunResult) {
    info!("--- Download Summary ---");
    info!("Playlist: {}", result.playlist_name);
    info!("Successfully downloaded: {} tracks.", result.succeeded);
    info!("Failed to download: {} tracks.", result.failed);
    if !result.failed_descriptors.is_empty() {
        info!("--- Failed Track Details ---");
        for track in &result.failed_descriptors {
            info!(
                "  - Name: {}, Artist: {}, Album: {}",
                track.name, track.artist, track.album
            );
        }
    }
}

fn log_run_summary(summary: &RunSummary) {
    info!(
        "--- Overall: {} playlist(s) processed, {} skipped, {} succeeded, {} failed ---",
        summary.playlists.len(),
        summary.skipped_playlists.len(),
        summary.succeeded(),
        summary.failed()
    );
    if summary.failed() == 0 && !summary.playlists.is_empty() {
        info!("All tracks processed successfully or were already downloaded.");
    }
}
