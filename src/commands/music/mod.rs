//! Music commands and the player machinery behind them.

pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;
pub mod stop;

pub mod audio_sources;
pub mod utils;

use poise::serenity_prelude as serenity;
use tracing::debug;
use utils::{
    dispatcher::{CommandRequest, Invoker, MusicCommand},
    embedded_messages,
    music_manager::MusicError,
};

use crate::{CommandResult, Context};

/// Get the voice channel ID that the user is currently in
fn user_voice_channel(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Option<serenity::ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Run a music command through the guild's player and send its one reply.
async fn run(ctx: Context<'_>, command: MusicCommand) -> CommandResult {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.send(embedded_messages::error(&MusicError::NotInGuild))
            .await?;
        return Ok(());
    };

    // The guild worker may be busy resolving an earlier play
    ctx.defer().await?;

    let invoker = Invoker {
        voice_channel: user_voice_channel(ctx.serenity_context(), guild_id, ctx.author().id),
        text_channel: ctx.channel_id(),
    };

    let result = ctx
        .data()
        .jukebox
        .dispatch(guild_id, CommandRequest { command, invoker })
        .await;

    let reply = match &result {
        Ok(reply) => embedded_messages::reply(reply),
        Err(err) => {
            debug!("Music command rejected in guild {}: {}", guild_id, err);
            embedded_messages::error(err)
        }
    };
    ctx.send(reply).await?;

    Ok(())
}
