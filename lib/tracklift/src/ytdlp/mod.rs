use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, TrackliftError};
use crate::sanitize::AUDIO_EXTENSION;
use crate::traits::{AudioFetcher, FetchOutput};

const DEFAULT_BINARY: &str = "yt-dlp";

/// Searches YouTube for the first match of a query and extracts its audio
/// with the `yt-dlp` command line tool.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn tool_name(&self) -> String {
        self.binary
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_BINARY.to_string())
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

/// Arguments for a single-result, audio-only search download to `output`.
pub fn build_args(query: &str, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--extract-audio",
        "--audio-format",
        AUDIO_EXTENSION,
        "--audio-quality",
        "0",
        "--output",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(output.as_os_str().to_owned());
    args.extend(
        [
            "--default-search",
            "ytsearch1:",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            // the query is free text and may start with a dash
            "--",
            query,
        ]
        .iter()
        .map(OsString::from),
    );
    args
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    fn name(&self) -> &'static str {
        "yt-dlp (YouTube search)"
    }

    async fn fetch(&self, query: &str, output: &Path) -> Result<FetchOutput> {
        debug!("Running {:?} for query '{}'", self.binary, query);

        let result = Command::new(&self.binary)
            .args(build_args(query, output))
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TrackliftError::ToolMissing {
                    tool: self.tool_name(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        Ok(FetchOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_request_single_search_result_to_exact_path() {
        let args = build_args("Band - Song audio", Path::new("/dl/Band - Song.mp3"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                "--output",
                "/dl/Band - Song.mp3",
                "--default-search",
                "ytsearch1:",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                "--",
                "Band - Song audio",
            ]
        );
    }

    #[test]
    fn dash_led_query_follows_the_option_terminator() {
        let args = build_args("-M- - Onde Sensuelle audio", Path::new("/dl/x.mp3"));
        let n = args.len();
        assert_eq!(args[n - 2], OsString::from("--"));
        assert_eq!(args[n - 1], OsString::from("-M- - Onde Sensuelle audio"));
    }

    /// Stand-in for yt-dlp that rejects unknown options the way its option
    /// parser does, and writes a stub file to `--output` on success.
    #[cfg(unix)]
    fn strict_fake_ytdlp(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --) shift; break ;;
    --output) out="$2"; shift 2 ;;
    --audio-format|--audio-quality|--default-search) shift 2 ;;
    --extract-audio|--no-playlist|--quiet|--no-warnings) shift ;;
    -*) echo "error: no such option: $1" >&2; exit 2 ;;
    *) shift ;;
  esac
done
[ $# -eq 1 ] || { echo "error: expected one query" >&2; exit 2; }
printf 'ID3' > "$out"
"#;
        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dash_led_artist_is_downloaded() {
        use crate::test_support::track;
        use crate::worker::AcquisitionWorker;
        use shared::download::AcquisitionStatus;
        use std::sync::Arc;

        let bin_dir = tempfile::tempdir().unwrap();
        let dl_dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new(strict_fake_ytdlp(bin_dir.path()));
        let worker = AcquisitionWorker::new(Arc::new(fetcher));

        for descriptor in [track("Band", "Song"), track("-M-", "Onde Sensuelle")] {
            let outcome = worker.acquire(&descriptor, dl_dir.path()).await;
            assert_eq!(
                outcome.status,
                AcquisitionStatus::Downloaded,
                "{}",
                descriptor.display_name()
            );
        }
        assert!(dl_dir.path().join("-M- - Onde Sensuelle.mp3").exists());
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_tool_missing() {
        let fetcher = YtDlpFetcher::new("/nonexistent/bin/yt-dlp-xyz");
        let err = fetcher
            .fetch("query", Path::new("/tmp/out.mp3"))
            .await
            .unwrap_err();

        match err {
            TrackliftError::ToolMissing { tool } => assert_eq!(tool, "yt-dlp-xyz"),
            other => panic!("expected ToolMissing, got {other:?}"),
        }
        assert!(!fetcher.health_check().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_an_unsuccessful_output() {
        // `false` ignores its arguments and exits 1
        let fetcher = YtDlpFetcher::new("false");
        let output = fetcher
            .fetch("query", Path::new("/tmp/out.mp3"))
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_a_successful_output() {
        let fetcher = YtDlpFetcher::new("true");
        let output = fetcher
            .fetch("query", Path::new("/tmp/out.mp3"))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
    }
}
