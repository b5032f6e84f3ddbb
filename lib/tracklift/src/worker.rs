use shared::download::{AcquisitionOutcome, AcquisitionStatus};
use shared::playlist::TrackDescriptor;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::TrackliftError;
use crate::sanitize::track_file_path;
use crate::traits::AudioFetcher;

/// Acquires one track into a directory, skipping tracks whose file already
/// exists. Never fails: every problem ends up in the returned status.
#[derive(Clone)]
pub struct AcquisitionWorker {
    fetcher: Arc<dyn AudioFetcher>,
}

impl AcquisitionWorker {
    pub fn new(fetcher: Arc<dyn AudioFetcher>) -> Self {
        Self { fetcher }
    }

    /// Free-text query handed to the fetch tool
    pub fn search_query(track: &TrackDescriptor) -> String {
        format!("{} audio", track.display_name())
    }

    pub async fn acquire(&self, track: &TrackDescriptor, target_dir: &Path) -> AcquisitionOutcome {
        let status = self.acquire_status(track, target_dir).await;
        AcquisitionOutcome {
            descriptor: track.clone(),
            status,
        }
    }

    async fn acquire_status(&self, track: &TrackDescriptor, target_dir: &Path) -> AcquisitionStatus {
        let output_path = track_file_path(target_dir, track);
        info!("Processing: {}", track.display_name());

        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            info!("Skipping '{}', already downloaded.", output_path.display());
            return AcquisitionStatus::Skipped;
        }

        let query = Self::search_query(track);
        match self.fetcher.fetch(&query, &output_path).await {
            Ok(output) if output.success => {
                info!("Successfully downloaded: {}", output_path.display());
                AcquisitionStatus::Downloaded
            }
            Ok(output) => {
                let mut message = match output.exit_code {
                    Some(code) => format!("Failed to download '{query}' (exit code {code})."),
                    None => format!("Failed to download '{query}' (terminated by signal)."),
                };
                if !output.stderr.is_empty() {
                    message.push_str(&format!(" {} stderr: {}", self.fetcher.id(), output.stderr));
                }
                error!("{}", message);
                AcquisitionStatus::Failed(message)
            }
            Err(e @ TrackliftError::ToolMissing { .. }) => {
                error!("{}", e);
                AcquisitionStatus::Failed(e.to_string())
            }
            Err(e) => {
                let message = format!("An error occurred during download for '{query}': {e}");
                error!("{}", message);
                AcquisitionStatus::Failed(message)
            }
        }
    }
}
