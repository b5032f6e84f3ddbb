//! Filesystem-safe names for playlist folders and track files.
//!
//! Both functions are lossy. Two inputs that differ only in replaced
//! characters map to the same name. If the colliding tracks run one after the
//! other the later one is skipped as already present. If they run at the same
//! time in one batch, both fetches write the same path and the last writer
//! wins.

use regex::Regex;
use shared::playlist::TrackDescriptor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extension of every acquired audio file
pub const AUDIO_EXTENSION: &str = "mp3";

const UNTITLED_PLAYLIST: &str = "Untitled_Playlist";

fn reserved_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid reserved character regex"))
}

fn control_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x00-\x1f\x7f]").expect("valid control character regex"))
}

fn underscore_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid underscore regex"))
}

/// Replaces every character outside `[alphanumeric, ' ', '.', '_', '-']` with `_`.
pub fn safe_file_stem(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<dir>/<safe "artist - name">.mp3`
pub fn track_file_path(dir: &Path, track: &TrackDescriptor) -> PathBuf {
    let stem = safe_file_stem(&track.display_name());
    dir.join(format!("{stem}.{AUDIO_EXTENSION}"))
}

/// Folder name for a playlist: reserved and control characters removed,
/// surrounding dots/spaces trimmed, underscore runs collapsed.
pub fn safe_folder_name(name: &str) -> String {
    let replaced = reserved_chars().replace_all(name, "_");
    let stripped = control_chars().replace_all(&replaced, "");
    let trimmed = stripped.trim_matches(|c| c == '.' || c == ' ');
    let collapsed = underscore_runs().replace_all(trimmed, "_");

    if collapsed.is_empty() {
        UNTITLED_PLAYLIST.to_string()
    } else {
        collapsed.into_owned()
    }
}
