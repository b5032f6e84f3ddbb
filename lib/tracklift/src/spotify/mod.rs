mod client;
mod models;

pub use client::{parse_playlist_id, SpotifyClient, SpotifyClientBuilder};
