use async_trait::async_trait;
use shared::playlist::ResolvedPlaylist;
use std::path::Path;

use crate::error::Result;

/// Turns a playlist reference (URL, URI or ID) into its name and track list.
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn resolve(&self, playlist_ref: &str) -> Result<ResolvedPlaylist>;
}

/// What an external fetch run reported back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

/// Fetches audio for a free-text search query into an exact output path.
///
/// `Err` is reserved for failures to run the tool at all; a run that exits
/// non-zero is an `Ok` with `success == false`.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;

    async fn fetch(&self, query: &str, output: &Path) -> Result<FetchOutput>;
    async fn health_check(&self) -> bool;
}
