use serenity::model::id::ChannelId;
use std::fmt;

use super::queue_manager::{QueueSnapshot, TrackReference};

/// The single response a music command produces on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    NowPlaying { title: String },
    Queued { track: TrackReference, position: usize },
    Skipped,
    Stopped,
    Paused,
    Resumed,
    Queue(QueueSnapshot),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::NowPlaying { title } => write!(f, "Now playing: **{}**", title),
            Reply::Queued { track, position } => {
                write!(f, "Added to queue at position #{}: {}", position, track)
            }
            Reply::Skipped => f.write_str("Skipped the current track."),
            Reply::Stopped => f.write_str("Music stopped and left the voice channel."),
            Reply::Paused => f.write_str("Paused the current track."),
            Reply::Resumed => f.write_str("Resumed playback."),
            Reply::Queue(snapshot) => write!(f, "{}", snapshot),
        }
    }
}

/// Something the bot announces on its own, outside of a command reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel_id: ChannelId,
    pub kind: NoticeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// A queued track started after the previous one ended.
    NowPlaying { title: String },
    /// A queued track could not be played and was dropped.
    PlaybackFailed { track: TrackReference, reason: String },
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeKind::NowPlaying { title } => write!(f, "Now playing: **{}**", title),
            NoticeKind::PlaybackFailed { track, reason } => {
                write!(f, "Couldn't play {}: {}", track, reason)
            }
        }
    }
}
