use super::*;

/// View the upcoming tracks
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    run(ctx, MusicCommand::Queue).await
}
