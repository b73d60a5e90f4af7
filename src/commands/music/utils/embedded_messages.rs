use poise::CreateReply;
use serenity::all::{CreateEmbed, CreateEmbedFooter, CreateMessage};

use super::{
    music_manager::MusicError,
    responses::{Notice, NoticeKind, Reply},
};

const SUCCESS_COLOR: u32 = 0x00ff00;
const ERROR_COLOR: u32 = 0xff0000;

/// Discord rejects embed descriptions longer than this many characters.
pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;

fn reply_title(reply: &Reply) -> &'static str {
    match reply {
        Reply::NowPlaying { .. } => "🎶 Now Playing",
        Reply::Queued { .. } => "🎵 Added to Queue",
        Reply::Skipped => "⏭️ Skipped",
        Reply::Stopped => "⏹️ Stopped",
        Reply::Paused => "⏸️ Paused",
        Reply::Resumed => "▶️ Resumed",
        Reply::Queue(_) => "📜 Music Queue",
    }
}

/// Create the embed reply for a successful music command
pub fn reply(reply: &Reply) -> CreateReply {
    let description = match reply {
        Reply::Queue(snapshot) => snapshot.listing(EMBED_DESCRIPTION_LIMIT),
        other => other.to_string(),
    };

    let mut embed = CreateEmbed::new()
        .title(reply_title(reply))
        .description(description)
        .color(SUCCESS_COLOR);

    if let Reply::Queue(snapshot) = reply {
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "{} track(s) queued",
            snapshot.len()
        )));
    }

    CreateReply::default().embed(embed)
}

/// Create the embed reply for a failed music command.
///
/// Errors that only concern the requesting user are sent ephemerally.
pub fn error(err: &MusicError) -> CreateReply {
    let ephemeral = matches!(
        err,
        MusicError::NotInVoiceChannel | MusicError::ChannelConflict | MusicError::EmptyQuery
    );

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title(error_title(err))
                .description(err.to_string())
                .color(ERROR_COLOR),
        )
        .ephemeral(ephemeral)
}

fn error_title(err: &MusicError) -> &'static str {
    match err {
        MusicError::QueueEmpty => "📭 Empty Queue",
        MusicError::NotInVoiceChannel | MusicError::ChannelConflict => "⚠️ Voice Channel",
        _ => "❌ Error",
    }
}

/// Create the message for an asynchronous announcement
pub fn notice(notice: &Notice) -> CreateMessage {
    let (title, color) = match &notice.kind {
        NoticeKind::NowPlaying { .. } => ("🎶 Now Playing", SUCCESS_COLOR),
        NoticeKind::PlaybackFailed { .. } => ("❌ Skipped Broken Track", ERROR_COLOR),
    };

    CreateMessage::new().embed(
        CreateEmbed::new()
            .title(title)
            .description(notice.kind.to_string())
            .color(color),
    )
}
