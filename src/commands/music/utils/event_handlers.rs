use std::sync::Arc;

use serenity::all::{Context, FullEvent, Http};
use serenity::async_trait;
use tokio::sync::{Mutex, mpsc::UnboundedReceiver};
use tracing::{debug, info, warn};

use super::embedded_messages;
use super::responses::Notice;
use super::transport::FinishedSignal;
use crate::{Data, Error};

/// Songbird event handler for when a song ends or errors out.
///
/// Registered for both `End` and `Error` on the same track; the shared slot makes
/// sure only the first of the two reaches the guild worker.
#[derive(Clone)]
pub struct SongEndNotifier {
    signal: Arc<Mutex<Option<FinishedSignal>>>,
}

impl SongEndNotifier {
    pub fn new(signal: FinishedSignal) -> Self {
        Self {
            signal: Arc::new(Mutex::new(Some(signal))),
        }
    }
}

#[async_trait]
impl songbird::EventHandler for SongEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(_) = ctx {
            if let Some(signal) = self.signal.lock().await.take() {
                debug!("Track {:?} finished", signal.token());
                signal.notify();
            }
        }
        None
    }
}

/// Framework-level event hook.
pub async fn handle_event(
    ctx: &Context,
    event: &FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Bot ready as {}", data_about_bot.user.name);
        }
        FullEvent::VoiceStateUpdate { old, new } => {
            let bot_id = ctx.cache.current_user().id;
            if new.user_id != bot_id {
                return Ok(());
            }
            let Some(guild_id) = new.guild_id else {
                return Ok(());
            };
            let previous = old.as_ref().and_then(|state| state.channel_id);

            match new.channel_id {
                // Kicked, or the channel was deleted
                None => {
                    info!("Disconnected from voice in guild {}", guild_id);
                    data.jukebox.voice_disconnected(guild_id, previous);
                }
                // Also seen after our own joins; the player ignores its current channel
                Some(channel_id) => {
                    debug!("In voice channel {} in guild {}", channel_id, guild_id);
                    data.jukebox.voice_moved(guild_id, channel_id);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Deliver asynchronous announcements (e.g. the next track starting) to their text channels.
pub async fn forward_notices(http: Arc<Http>, mut notices: UnboundedReceiver<Notice>) {
    while let Some(notice) = notices.recv().await {
        let message = embedded_messages::notice(&notice);
        if let Err(e) = notice.channel_id.send_message(&*http, message).await {
            warn!(
                "Failed to send notice to channel {}: {}",
                notice.channel_id, e
            );
        }
    }
    debug!("Notice channel closed");
}
