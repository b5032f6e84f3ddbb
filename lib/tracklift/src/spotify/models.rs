use serde::Deserialize;
use shared::playlist::TrackDescriptor;

const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistInfo {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyTrack {
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyArtist {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyAlbum {
    pub name: Option<String>,
}

impl PlaylistItem {
    /// `None` for removed tracks, episodes and anything without a title or artist
    pub fn into_descriptor(self, playlist_name: &str) -> Option<TrackDescriptor> {
        let track = self.track?;
        let name = track.name.filter(|n| !n.is_empty())?;
        let artist = track
            .artists
            .into_iter()
            .next()?
            .name
            .filter(|n| !n.is_empty())?;
        let album = track
            .album
            .and_then(|a| a.name)
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        Some(TrackDescriptor {
            name,
            artist,
            album,
            playlist_attempted: playlist_name.to_string(),
        })
    }
}
