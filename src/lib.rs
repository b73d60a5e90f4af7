//! A Discord music bot: joins a voice channel, streams audio resolved from a search
//! or URL, and keeps one playback queue per server.

use std::sync::Arc;

pub mod commands;
pub mod utils;

use commands::music::utils::dispatcher::Jukebox;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub jukebox: Arc<Jukebox>,
}
