use serde::{Deserialize, Serialize};

/// One track to acquire, as resolved from a catalog playlist.
///
/// Acquisition identity is the `(artist, name)` pair. Two descriptors with the
/// same pair are still independent work items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Name of the playlist this track was attempted from
    #[serde(alias = "playlistAttempted")]
    pub playlist_attempted: String,
}

impl TrackDescriptor {
    pub fn new(
        name: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        playlist_attempted: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            album: album.into(),
            playlist_attempted: playlist_attempted.into(),
        }
    }

    /// `"{artist} - {name}"`, used for log lines and file naming
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.name)
    }
}

/// A playlist flattened out of the catalog: its name plus every usable track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlaylist {
    pub name: String,
    pub tracks: Vec<TrackDescriptor>,
}
