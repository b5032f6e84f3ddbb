//! On-disk record of tracks that failed to download, merged across runs.
//!
//! The file is a JSON array. Anything else found at the path (empty, garbage,
//! an object) is discarded and replaced on the next write.

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use shared::playlist::TrackDescriptor;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::Result;

/// Ledger entries split by whether they still parse as track descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerContents {
    pub tracks: Vec<TrackDescriptor>,
    /// Entries kept verbatim because they are not track descriptors
    pub foreign: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: PathBuf,
}

impl FailureLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `new_failures` after whatever the ledger already holds and
    /// writes the result back in one replacement. Returns whether the write
    /// succeeded; failures are logged, never propagated.
    pub async fn merge_and_write(&self, new_failures: &[TrackDescriptor]) -> bool {
        let mut entries = self.read_entries().await;
        let existing = entries.len();
        for track in new_failures {
            match serde_json::to_value(track) {
                Ok(value) => entries.push(value),
                Err(e) => error!("Could not serialize failed track {}: {}", track.display_name(), e),
            }
        }

        match self.write_entries(&entries).await {
            Ok(()) => {
                info!(
                    "Appended {} failed track(s) to {} ({} already recorded)",
                    new_failures.len(),
                    self.path.display(),
                    existing
                );
                true
            }
            Err(e) => {
                error!("Could not write to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Reads the ledger, separating track descriptors from anything else
    pub async fn load(&self) -> LedgerContents {
        let mut contents = LedgerContents::default();
        for entry in self.read_entries().await {
            match serde_json::from_value::<TrackDescriptor>(entry.clone()) {
                Ok(track) => contents.tracks.push(track),
                Err(_) => contents.foreign.push(entry),
            }
        }
        contents
    }

    /// Overwrites the ledger with `foreign` entries followed by `tracks`
    pub async fn replace(&self, contents: &LedgerContents) -> bool {
        let mut entries = contents.foreign.clone();
        for track in &contents.tracks {
            match serde_json::to_value(track) {
                Ok(value) => entries.push(value),
                Err(e) => error!("Could not serialize failed track {}: {}", track.display_name(), e),
            }
        }

        match self.write_entries(&entries).await {
            Ok(()) => {
                info!("Rewrote {} with {} entries", self.path.display(), entries.len());
                true
            }
            Err(e) => {
                error!("Could not write to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    async fn read_entries(&self) -> Vec<Value> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                error!("Error reading {}: {}. Starting fresh list.", self.path.display(), e);
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!(
                    "Existing content in {} is not a list. Overwriting with new failures.",
                    self.path.display()
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Could not decode JSON from {} ({}). File might be corrupted. Starting fresh list.",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Writes to a sibling temp file first so the ledger is never left half-written
    async fn write_entries(&self, entries: &[Value]) -> Result<()> {
        let bytes = to_pretty_json(entries)?;
        let tmp_path = self.tmp_path();

        if let Err(e) = tokio::fs::write(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}

fn to_pretty_json(entries: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    entries.serialize(&mut serializer)?;
    Ok(buf)
}
