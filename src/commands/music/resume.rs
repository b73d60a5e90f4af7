use super::*;

/// Resume the paused track
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    run(ctx, MusicCommand::Resume).await
}
