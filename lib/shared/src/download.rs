use serde::{Deserialize, Serialize};

use crate::playlist::TrackDescriptor;

/// How a single acquisition ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionStatus {
    /// The fetch tool produced the file
    Downloaded,
    /// The target file was already present, nothing was fetched
    Skipped,
    /// The acquisition failed, with a human-readable cause
    Failed(String),
}

impl AcquisitionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, AcquisitionStatus::Downloaded | AcquisitionStatus::Skipped)
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            AcquisitionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionOutcome {
    pub descriptor: TrackDescriptor,
    pub status: AcquisitionStatus,
}

impl AcquisitionOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Tally for one playlist batch.
///
/// `failed_descriptors` follows completion order, not submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRunResult {
    pub playlist_name: String,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_descriptors: Vec<TrackDescriptor>,
}

impl PlaylistRunResult {
    pub fn new(playlist_name: impl Into<String>) -> Self {
        Self {
            playlist_name: playlist_name.into(),
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Aggregate over every playlist handled in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub playlists: Vec<PlaylistRunResult>,
    /// Playlist references that could not be resolved or had no tracks
    pub skipped_playlists: Vec<String>,
    /// Whether the failure ledger was written at the end of the run
    pub ledger_written: bool,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.playlists.iter().map(|p| p.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.playlists.iter().map(|p| p.failed).sum()
    }

    pub fn failed_descriptors(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.playlists.iter().flat_map(|p| p.failed_descriptors.iter())
    }
}
