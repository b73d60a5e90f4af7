use super::*;

/// Stop the music, clear the queue, and leave the voice channel
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    run(ctx, MusicCommand::Stop).await
}
