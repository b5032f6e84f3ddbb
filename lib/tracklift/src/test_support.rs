//! In-memory collaborators for exercising the pipeline without a network or
//! an installed fetch tool.

use async_trait::async_trait;
use shared::playlist::{ResolvedPlaylist, TrackDescriptor};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, TrackliftError};
use crate::traits::{AudioFetcher, CatalogResolver, FetchOutput};

#[derive(Default)]
struct FetcherState {
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    missing_tool: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

/// Writes a small file for every query unless told to fail or panic on it.
/// Matching is by substring of the search query.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    state: Arc<FetcherState>,
}

impl FakeFetcher {
    pub fn fail_on(self, pattern: &str) -> Self {
        self.state.failing.lock().unwrap().insert(pattern.to_string());
        self
    }

    pub fn panic_on(self, pattern: &str) -> Self {
        self.state.panicking.lock().unwrap().insert(pattern.to_string());
        self
    }

    pub fn missing_tool(self) -> Self {
        self.state.missing_tool.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().unwrap().clone()
    }

    fn matches(set: &Mutex<HashSet<String>>, query: &str) -> bool {
        set.lock().unwrap().iter().any(|p| query.contains(p.as_str()))
    }
}

#[async_trait]
impl AudioFetcher for FakeFetcher {
    fn id(&self) -> &'static str {
        "fake-fetcher"
    }

    fn name(&self) -> &'static str {
        "Fake fetcher"
    }

    async fn fetch(&self, query: &str, output: &Path) -> Result<FetchOutput> {
        let state = &self.state;
        state.calls.fetch_add(1, Ordering::SeqCst);
        state.queries.lock().unwrap().push(query.to_string());

        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if Self::matches(&state.panicking, query) {
            panic!("fake fetcher exploded on '{query}'");
        }
        if state.missing_tool.load(Ordering::SeqCst) {
            return Err(TrackliftError::ToolMissing {
                tool: "fake-dl".to_string(),
            });
        }
        if Self::matches(&state.failing, query) {
            return Ok(FetchOutput {
                success: false,
                exit_code: Some(1),
                stderr: "ERROR: no search results".to_string(),
            });
        }

        tokio::fs::write(output, b"ID3").await?;
        Ok(FetchOutput {
            success: true,
            exit_code: Some(0),
            stderr: String::new(),
        })
    }

    async fn health_check(&self) -> bool {
        !self.state.missing_tool.load(Ordering::SeqCst)
    }
}

/// Serves playlists from a map; unknown references resolve to a 404.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    playlists: Arc<Mutex<HashMap<String, ResolvedPlaylist>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeCatalog {
    pub fn with_playlist(self, playlist_ref: &str, name: &str, tracks: &[(&str, &str)]) -> Self {
        let tracks = tracks
            .iter()
            .map(|(artist, title)| TrackDescriptor::new(*title, *artist, "Album", name))
            .collect();
        self.playlists.lock().unwrap().insert(
            playlist_ref.to_string(),
            ResolvedPlaylist {
                name: name.to_string(),
                tracks,
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogResolver for FakeCatalog {
    fn id(&self) -> &'static str {
        "fake-catalog"
    }

    fn name(&self) -> &'static str {
        "Fake catalog"
    }

    async fn resolve(&self, playlist_ref: &str) -> Result<ResolvedPlaylist> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.playlists
            .lock()
            .unwrap()
            .get(playlist_ref)
            .cloned()
            .ok_or_else(|| TrackliftError::Api {
                status: 404,
                message: format!("no playlist {playlist_ref}"),
            })
    }
}

pub fn track(artist: &str, name: &str) -> TrackDescriptor {
    TrackDescriptor::new(name, artist, "Album", "Playlist")
}
