use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackliftError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("client is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a playlist URL, URI or ID: '{0}'")]
    InvalidPlaylistRef(String),

    #[error("playlist {0} returned no name")]
    UnnamedPlaylist(String),

    #[error("{tool} command not found. Make sure it's installed and in your PATH")]
    ToolMissing { tool: String },
}

pub type Result<T> = std::result::Result<T, TrackliftError>;
