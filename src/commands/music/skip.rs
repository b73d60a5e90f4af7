use super::*;

/// Skip the currently playing song
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    run(ctx, MusicCommand::Skip).await
}
