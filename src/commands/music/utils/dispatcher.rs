use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    oneshot,
};
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::TrackResolver;

use super::music_manager::{GuildPlayer, MusicError, MusicResult, PlayerContext};
use super::queue_manager::QueueStore;
use super::responses::{Notice, Reply};
use super::transport::{TrackToken, TransportSink};

/// The music commands users can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicCommand {
    Play(String),
    Skip,
    Stop,
    Pause,
    Resume,
    Queue,
}

/// Where the requesting user is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invoker {
    /// The voice channel the user is connected to, if any.
    pub voice_channel: Option<ChannelId>,
    /// The text channel the command was sent from.
    pub text_channel: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: MusicCommand,
    pub invoker: Invoker,
}

/// Everything a guild's worker reacts to, in the order it was posted.
pub enum GuildEvent {
    Command {
        request: CommandRequest,
        reply: oneshot::Sender<MusicResult<Reply>>,
    },
    TrackFinished(TrackToken),
    /// The bot left voice without being told to. `channel_id` is the channel it was in, if known.
    VoiceDisconnected { channel_id: Option<ChannelId> },
    /// The bot was moved to another voice channel of the same guild.
    VoiceMoved { channel_id: ChannelId },
}

/// Process-wide registry of guild players.
///
/// Each guild gets its own worker task, spawned on first use. Commands and finish
/// signals for one guild are handled strictly in order, while different guilds
/// never wait on each other.
pub struct Jukebox {
    context: PlayerContext,
    workers: DashMap<GuildId, UnboundedSender<GuildEvent>>,
}

impl Jukebox {
    /// Build the registry. The returned receiver yields announcements that should be
    /// posted to text channels.
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        transport: Arc<dyn TransportSink>,
        resolve_timeout: Option<Duration>,
    ) -> (Self, UnboundedReceiver<Notice>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let context = PlayerContext {
            queues: Arc::new(QueueStore::new()),
            resolver,
            transport,
            notices,
            resolve_timeout,
        };

        let jukebox = Self {
            context,
            workers: DashMap::new(),
        };
        (jukebox, notice_rx)
    }

    pub fn queues(&self) -> &QueueStore {
        &self.context.queues
    }

    /// Route a command to the guild's player and wait for its reply.
    pub async fn dispatch(&self, guild_id: GuildId, request: CommandRequest) -> MusicResult<Reply> {
        debug!("Dispatching {:?} for guild {}", request.command, guild_id);
        let (reply, response) = oneshot::channel();
        self.worker(guild_id)
            .send(GuildEvent::Command { request, reply })
            .map_err(|_| MusicError::PlayerUnavailable)?;

        response.await.map_err(|_| MusicError::PlayerUnavailable)?
    }

    /// Tell the guild's player the bot was dropped from `channel_id`.
    pub fn voice_disconnected(&self, guild_id: GuildId, channel_id: Option<ChannelId>) {
        if let Some(worker) = self.workers.get(&guild_id) {
            if worker.send(GuildEvent::VoiceDisconnected { channel_id }).is_err() {
                debug!("Worker for guild {} already stopped", guild_id);
            }
        }
    }

    /// Tell the guild's player the bot now sits in `channel_id`.
    pub fn voice_moved(&self, guild_id: GuildId, channel_id: ChannelId) {
        if let Some(worker) = self.workers.get(&guild_id) {
            if worker.send(GuildEvent::VoiceMoved { channel_id }).is_err() {
                debug!("Worker for guild {} already stopped", guild_id);
            }
        }
    }

    fn worker(&self, guild_id: GuildId) -> UnboundedSender<GuildEvent> {
        let mut worker = self
            .workers
            .entry(guild_id)
            .or_insert_with(|| spawn_worker(guild_id, self.context.clone()));

        if worker.is_closed() {
            warn!("Player worker for guild {} died, restarting it", guild_id);
            *worker = spawn_worker(guild_id, self.context.clone());
        }
        worker.clone()
    }
}

fn spawn_worker(guild_id: GuildId, context: PlayerContext) -> UnboundedSender<GuildEvent> {
    let (events, mut inbox) = mpsc::unbounded_channel();
    let mut player = GuildPlayer::new(guild_id, context, events.downgrade());

    info!("Starting player worker for guild {}", guild_id);
    tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            player.handle_event(event).await;
        }
        info!("Player worker for guild {} stopped", player.guild_id());
    });

    events
}
