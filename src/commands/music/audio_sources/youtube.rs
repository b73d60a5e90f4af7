//! Implements [`TrackResolver`] by running the `yt-dlp` command-line tool and reading
//! the JSON it prints for the selected audio format.

use crate::commands::music::utils::{
    music_manager::MusicError,
    queue_manager::{QueryKind, TrackReference},
};
use serde::Deserialize;
use serenity::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{AudioSourceResult, ResolvedTrack, TrackResolver};

const UNKNOWN_TITLE: &str = "Unknown track";

/// Format selector handed to `yt-dlp`; audio only, falling back to the best muxed stream.
const FORMAT_SELECTOR: &str = "bestaudio/best";

/// The subset of `yt-dlp -j` output we care about.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    url: Option<String>,
    title: Option<String>,
    /// Present when the extractor returned a search/playlist result instead of a video.
    entries: Option<Vec<YtDlpInfo>>,
}

/// Resolver backed by a local `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: String,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The argument `yt-dlp` receives for this reference; search terms go through `ytsearch:`.
    pub fn extractor_query(track: &TrackReference) -> String {
        match track.kind() {
            QueryKind::Url => track.query().to_string(),
            QueryKind::Search => format!("ytsearch:{}", track.query()),
        }
    }

    /// Pick the stream URL and title out of `yt-dlp -j` stdout.
    ///
    /// Search results are printed one JSON document per line, so only the first
    /// non-empty line is considered.
    pub fn parse_output(stdout: &[u8]) -> AudioSourceResult<ResolvedTrack> {
        let text = String::from_utf8_lossy(stdout);
        let first = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| MusicError::ResolutionError("no results found".to_string()))?;

        let mut info: YtDlpInfo = serde_json::from_str(first).map_err(|e| {
            MusicError::ResolutionError(format!("failed to parse extractor output: {}", e))
        })?;

        // Playlist-shaped result: take the first entry
        if let Some(entries) = info.entries.take() {
            info = entries
                .into_iter()
                .next()
                .ok_or_else(|| MusicError::ResolutionError("no results found".to_string()))?;
        }

        let stream_url = info.url.ok_or_else(|| {
            MusicError::ResolutionError("extractor returned no stream URL".to_string())
        })?;

        Ok(ResolvedTrack {
            stream_url,
            title: info.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        })
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, track: &TrackReference) -> AudioSourceResult<ResolvedTrack> {
        let query = Self::extractor_query(track);
        info!("Resolving '{}' with {}", query, self.program);

        let output = Command::new(&self.program)
            .args([
                "-j",            // Output as JSON
                "--no-playlist", // Don't process playlists
                "-f",
                FORMAT_SELECTOR,
                &query,
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MusicError::ResolutionError(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited with an error")
                .trim()
                .to_string();
            return Err(MusicError::ResolutionError(reason));
        }

        let resolved = Self::parse_output(&output.stdout)?;
        debug!("Resolved '{}' to '{}'", query, resolved.title);
        Ok(resolved)
    }
}
