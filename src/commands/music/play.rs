use super::*;
use tracing::info;

/// Play a song from YouTube or a direct URL, or queue it if something is already playing
#[poise::command(prefix_command, slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"]
    #[rest]
    query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);

    run(ctx, MusicCommand::Play(query)).await
}
