use super::*;

/// Pause the current track
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    run(ctx, MusicCommand::Pause).await
}
