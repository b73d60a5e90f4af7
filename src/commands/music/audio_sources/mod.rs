//! The resolver boundary: turning a user query into something the transport can stream.
//! The production implementation shells out to `yt-dlp` (see [`youtube`]).

/// Submodule implementing [`TrackResolver`] on top of `yt-dlp`.
pub(crate) mod youtube;

use crate::commands::music::utils::{music_manager::MusicError, queue_manager::TrackReference};
use serenity::async_trait;

pub use youtube::YtDlpResolver;

/// A specialized `Result` type for resolver operations.
pub type AudioSourceResult<T> = Result<T, MusicError>;

/// A playable stream and the title to announce for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub stream_url: String,
    pub title: String,
}

/// Resolves queued references into stream URLs.
///
/// Direct URLs are extracted as-is. Anything else is treated as a search term and the
/// first result is used. Every failure (no results, network, unsupported site) is
/// reported as [`MusicError::ResolutionError`].
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, track: &TrackReference) -> AudioSourceResult<ResolvedTrack>;
}
