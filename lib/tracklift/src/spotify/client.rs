use super::models::{PlaylistInfo, PlaylistTracksPage, TokenResponse};
use crate::{
    error::{Result, TrackliftError},
    traits::CatalogResolver,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::playlist::{ResolvedPlaylist, TrackDescriptor};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_API_URL: &str = "https://api.spotify.com";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Largest page the playlist items endpoint serves
const PAGE_LIMIT: u32 = 100;

/// Refresh the access token this long before Spotify says it expires
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

const TRACK_FIELDS: &str = "items(track(name,artists(name),album(name))),next";

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Spotify Web API client using the client-credentials flow, which is enough
/// to read public playlists.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    api_url: Url,
    accounts_url: Url,
    client_id: String,
    client_secret: String,
    client: Client,
    token: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Default)]
pub struct SpotifyClientBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_url: Option<String>,
    accounts_url: Option<String>,
}

impl SpotifyClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn client_id(mut self, id: &str) -> Self {
        self.client_id = Some(id.to_string());
        self
    }

    pub fn client_secret(mut self, secret: &str) -> Self {
        self.client_secret = Some(secret.to_string());
        self
    }

    pub fn api_url(mut self, url: &str) -> Self {
        self.api_url = Some(url.to_string());
        self
    }

    pub fn accounts_url(mut self, url: &str) -> Self {
        self.accounts_url = Some(url.to_string());
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let client_id = self
            .client_id
            .filter(|s| !s.is_empty())
            .ok_or(TrackliftError::NotConfigured("Spotify client id"))?;
        let client_secret = self
            .client_secret
            .filter(|s| !s.is_empty())
            .ok_or(TrackliftError::NotConfigured("Spotify client secret"))?;

        Ok(SpotifyClient {
            api_url: base_url(self.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?,
            accounts_url: base_url(self.accounts_url.as_deref().unwrap_or(DEFAULT_ACCOUNTS_URL))?,
            client_id,
            client_secret,
            client: Client::new(),
            token: Arc::new(Mutex::new(None)),
        })
    }
}

/// Parses with a trailing slash so `join` appends instead of replacing
fn base_url(url: &str) -> Result<Url> {
    Ok(Url::parse(&format!("{}/", url.trim_end_matches('/')))?)
}

/// Extracts the playlist ID from an `open.spotify.com` URL, a
/// `spotify:playlist:` URI, or a bare ID.
pub fn parse_playlist_id(reference: &str) -> Result<String> {
    let reference = reference.trim();
    let invalid = || TrackliftError::InvalidPlaylistRef(reference.to_string());

    let candidate = if let Some(id) = reference.strip_prefix("spotify:playlist:") {
        id.to_string()
    } else if let Ok(url) = Url::parse(reference) {
        if !url
            .host_str()
            .is_some_and(|h| h == "spotify.com" || h.ends_with(".spotify.com"))
        {
            return Err(invalid());
        }
        let mut segments = url.path_segments().ok_or_else(invalid)?;
        segments
            .by_ref()
            .find(|segment| *segment == "playlist")
            .ok_or_else(invalid)?;
        segments.next().ok_or_else(invalid)?.to_string()
    } else {
        reference.to_string()
    };

    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(candidate)
    } else {
        Err(invalid())
    }
}

impl SpotifyClient {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let url = self.accounts_url.join("api/token")?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let token: TokenResponse = Self::handle_response(response).await?;

        let lifetime = (token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(lifetime),
        });
        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let token = self.access_token().await?;
        debug!("Request: GET {}", url);
        let response = self.client.get(url).bearer_auth(token).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| TrackliftError::Api {
                status: status.as_u16(),
                message: format!("JSON parse error: {e}"),
            })
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            Err(TrackliftError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    pub async fn playlist_name(&self, playlist_id: &str) -> Result<String> {
        let mut url = self.api_url.join(&format!("v1/playlists/{playlist_id}"))?;
        url.query_pairs_mut().append_pair("fields", "name");
        let info: PlaylistInfo = self.get_json(url).await?;
        info.name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| TrackliftError::UnnamedPlaylist(playlist_id.to_string()))
    }

    /// Follows `next` links until the listing is exhausted
    pub async fn playlist_tracks(
        &self,
        playlist_id: &str,
        playlist_name: &str,
    ) -> Result<Vec<TrackDescriptor>> {
        let mut url = self.api_url.join(&format!("v1/playlists/{playlist_id}/tracks"))?;
        url.query_pairs_mut()
            .append_pair("limit", &PAGE_LIMIT.to_string())
            .append_pair("fields", TRACK_FIELDS);

        let mut tracks = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;
        while let Some(page_url) = next.take() {
            let page: PlaylistTracksPage = self.get_json(page_url).await?;
            pages += 1;
            let listed = page.items.len();
            let before = tracks.len();
            tracks.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.into_descriptor(playlist_name)),
            );
            if tracks.len() - before < listed {
                debug!(
                    "Dropped {} unusable item(s) from page {}",
                    listed - (tracks.len() - before),
                    pages
                );
            }
            next = page.next.as_deref().map(Url::parse).transpose()?;
        }

        if tracks.is_empty() {
            warn!("No items found in playlist: {}", playlist_id);
        }
        Ok(tracks)
    }
}

#[async_trait]
impl CatalogResolver for SpotifyClient {
    fn id(&self) -> &'static str {
        "spotify"
    }

    fn name(&self) -> &'static str {
        "Spotify"
    }

    async fn resolve(&self, playlist_ref: &str) -> Result<ResolvedPlaylist> {
        let playlist_id = parse_playlist_id(playlist_ref)?;
        let name = self.playlist_name(&playlist_id).await?;
        let tracks = self.playlist_tracks(&playlist_id, &name).await?;
        info!("Resolved playlist '{}' with {} tracks", name, tracks.len());
        Ok(ResolvedPlaylist { name, tracks })
    }
}
