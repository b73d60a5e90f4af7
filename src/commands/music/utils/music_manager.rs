use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedSender, WeakUnboundedSender};
use tracing::{debug, error, info, warn};

use crate::commands::music::audio_sources::{ResolvedTrack, TrackResolver};

use super::dispatcher::{CommandRequest, GuildEvent, Invoker, MusicCommand};
use super::queue_manager::{QueueStore, TrackReference};
use super::responses::{Notice, NoticeKind, Reply};
use super::transport::{FinishedSignal, TrackToken, TransportSink, TransportStatus, VoiceConnection};

/// Errors that can occur during music operations.
///
/// The `Display` text is what the requesting user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MusicError {
    #[error("This command can only be used in a server")]
    NotInGuild,

    #[error("You need to be in a voice channel to use this command")]
    NotInVoiceChannel,

    #[error("I'm already playing music in another channel")]
    ChannelConflict,

    #[error("Nothing is playing right now")]
    NothingPlaying,

    #[error("Nothing is paused right now")]
    NothingPaused,

    #[error("The queue is empty")]
    QueueEmpty,

    #[error("Couldn't play that track: {0}")]
    ResolutionError(String),

    #[error("I'm not connected to a voice channel")]
    NoActiveConnection,

    #[error("Tell me what to play: a link or some search words")]
    EmptyQuery,

    #[error("Failed to join voice channel: {0}")]
    JoinError(String),

    #[error("Playback error: {0}")]
    TransportError(String),

    #[error("The music player for this server is unavailable")]
    PlayerUnavailable,
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

/// The track a session is currently streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTrack {
    pub track: TrackReference,
    pub title: String,
    pub token: TrackToken,
}

/// Per-guild playback state. Exists from the first successful voice join until stop or disconnect.
#[derive(Debug)]
pub struct PlaybackSession {
    connection: VoiceConnection,
    announce_channel: ChannelId,
    status: PlaybackStatus,
    current: Option<CurrentTrack>,
}

impl PlaybackSession {
    fn new(connection: VoiceConnection, announce_channel: ChannelId) -> Self {
        Self {
            connection,
            announce_channel,
            status: PlaybackStatus::Idle,
            current: None,
        }
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.connection.channel_id()
    }

    pub fn announce_channel(&self) -> ChannelId {
        self.announce_channel
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn current(&self) -> Option<&CurrentTrack> {
        self.current.as_ref()
    }

    fn begin(&mut self, track: TrackReference, title: String, token: TrackToken) {
        self.current = Some(CurrentTrack { track, title, token });
        self.status = PlaybackStatus::Playing;
    }

    fn finish(&mut self) {
        self.current = None;
        self.status = PlaybackStatus::Idle;
    }
}

/// Collaborators shared by every guild's player.
#[derive(Clone)]
pub struct PlayerContext {
    pub queues: Arc<QueueStore>,
    pub resolver: Arc<dyn TrackResolver>,
    pub transport: Arc<dyn TransportSink>,
    pub notices: UnboundedSender<Notice>,
    /// `None` waits on the resolver indefinitely.
    pub resolve_timeout: Option<Duration>,
}

/// Owns one guild's session and drives its state machine.
///
/// All mutation happens through `&mut self` on the guild's worker task, which
/// processes that guild's events strictly in arrival order.
pub struct GuildPlayer {
    guild_id: GuildId,
    context: PlayerContext,
    events: WeakUnboundedSender<GuildEvent>,
    session: Option<PlaybackSession>,
    next_token: u64,
}

impl GuildPlayer {
    /// `events` is the guild's own event queue; finish signals are posted there.
    pub fn new(
        guild_id: GuildId,
        context: PlayerContext,
        events: WeakUnboundedSender<GuildEvent>,
    ) -> Self {
        Self {
            guild_id,
            context,
            events,
            session: None,
            next_token: 0,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Idle, PlaybackSession::status)
    }

    pub async fn handle_event(&mut self, event: GuildEvent) {
        match event {
            GuildEvent::Command { request, reply } => {
                let result = self.handle_command(request).await;
                if reply.send(result).is_err() {
                    debug!("Requester for guild {} went away before the reply", self.guild_id);
                }
            }
            GuildEvent::TrackFinished(token) => self.track_finished(token).await,
            GuildEvent::VoiceDisconnected { channel_id } => self.voice_disconnected(channel_id).await,
            GuildEvent::VoiceMoved { channel_id } => self.voice_moved(channel_id),
        }
    }

    pub async fn handle_command(&mut self, request: CommandRequest) -> MusicResult<Reply> {
        let CommandRequest { command, invoker } = request;
        match command {
            MusicCommand::Play(query) => self.play(query, &invoker).await,
            MusicCommand::Skip => self.skip().await,
            MusicCommand::Stop => self.stop().await,
            MusicCommand::Pause => self.pause().await,
            MusicCommand::Resume => self.resume().await,
            MusicCommand::Queue => self.show_queue(),
        }
    }

    async fn play(&mut self, query: String, invoker: &Invoker) -> MusicResult<Reply> {
        let track = TrackReference::new(query);
        if track.query().is_empty() {
            return Err(MusicError::EmptyQuery);
        }

        let channel_id = invoker.voice_channel.ok_or(MusicError::NotInVoiceChannel)?;

        if let Some(session) = self.session.as_mut() {
            if session.voice_channel() != channel_id {
                return Err(MusicError::ChannelConflict);
            }
            session.announce_channel = invoker.text_channel;
        } else {
            let connection = self.context.transport.join(self.guild_id, channel_id).await?;
            info!("Created playback session for guild {} in {}", self.guild_id, channel_id);
            self.session = Some(PlaybackSession::new(connection, invoker.text_channel));
        }

        // Never interrupt: anything already playing or paused means the request waits its turn
        if self.status() != PlaybackStatus::Idle {
            let position = self.context.queues.enqueue(self.guild_id, track.clone());
            info!("Queued '{}' at #{} for guild {}", track, position, self.guild_id);
            return Ok(Reply::Queued { track, position });
        }

        match self.start_track(track).await {
            Ok(title) => Ok(Reply::NowPlaying { title }),
            Err(err) => {
                warn!("Failed to start playback in guild {}: {}", self.guild_id, err);
                self.advance().await;
                Err(err)
            }
        }
    }

    async fn skip(&mut self) -> MusicResult<Reply> {
        let session = self.session.as_ref().ok_or(MusicError::NothingPlaying)?;
        if self.context.transport.status(&session.connection).await == TransportStatus::Idle {
            return Err(MusicError::NothingPlaying);
        }

        self.context.transport.stop(&session.connection).await?;
        info!("Skipped current track in guild {}", self.guild_id);
        self.advance().await;
        Ok(Reply::Skipped)
    }

    async fn stop(&mut self) -> MusicResult<Reply> {
        let session = self.session.take().ok_or(MusicError::NoActiveConnection)?;
        self.context.queues.clear(self.guild_id);

        if let Err(e) = self.context.transport.stop(&session.connection).await {
            warn!("Failed to stop playback in guild {}: {}", self.guild_id, e);
        }
        if let Err(e) = self.context.transport.leave(session.connection).await {
            warn!("Failed to leave voice channel in guild {}: {}", self.guild_id, e);
        }

        info!("Stopped playback and discarded session for guild {}", self.guild_id);
        Ok(Reply::Stopped)
    }

    async fn pause(&mut self) -> MusicResult<Reply> {
        let session = self.session.as_mut().ok_or(MusicError::NothingPlaying)?;
        if self.context.transport.status(&session.connection).await != TransportStatus::Playing {
            return Err(MusicError::NothingPlaying);
        }

        self.context.transport.pause(&session.connection).await?;
        session.status = PlaybackStatus::Paused;
        Ok(Reply::Paused)
    }

    async fn resume(&mut self) -> MusicResult<Reply> {
        let session = self.session.as_mut().ok_or(MusicError::NothingPaused)?;
        if self.context.transport.status(&session.connection).await != TransportStatus::Paused {
            return Err(MusicError::NothingPaused);
        }

        self.context.transport.resume(&session.connection).await?;
        session.status = PlaybackStatus::Playing;
        Ok(Reply::Resumed)
    }

    fn show_queue(&self) -> MusicResult<Reply> {
        let snapshot = self.context.queues.snapshot(self.guild_id);
        if snapshot.is_empty() {
            return Err(MusicError::QueueEmpty);
        }
        Ok(Reply::Queue(snapshot))
    }

    /// Handle an end-of-track signal. Signals for anything but the current track are stale.
    pub async fn track_finished(&mut self, token: TrackToken) {
        let current = self
            .session
            .as_ref()
            .and_then(|session| session.current())
            .map(|current| current.token);

        if current != Some(token) {
            debug!("Ignoring stale finish signal {:?} in guild {}", token, self.guild_id);
            return;
        }

        info!("Track ended for guild {}", self.guild_id);
        self.advance().await;
    }

    /// The bot was removed from voice without a stop command.
    pub async fn voice_disconnected(&mut self, channel_id: Option<ChannelId>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if channel_id.is_some_and(|channel_id| channel_id != session.voice_channel()) {
            debug!("Disconnect from an older channel in guild {}, ignoring", self.guild_id);
            return;
        }

        if let Some(session) = self.session.take() {
            self.context.queues.clear(self.guild_id);
            if let Err(e) = self.context.transport.stop(&session.connection).await {
                debug!("Stop after disconnect failed in guild {}: {}", self.guild_id, e);
            }
            if let Err(e) = self.context.transport.leave(session.connection).await {
                debug!("Leave after disconnect failed in guild {}: {}", self.guild_id, e);
            }
            info!("Discarded session for guild {} after voice disconnect", self.guild_id);
        }
    }

    /// The bot was dragged into `channel_id`; later plays are checked against it.
    pub fn voice_moved(&mut self, channel_id: ChannelId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.voice_channel() != channel_id {
            info!(
                "Moved from {} to {} in guild {}",
                session.voice_channel(),
                channel_id,
                self.guild_id
            );
            session.connection.move_to(channel_id);
        }
    }

    /// Move to the next queued track, dropping (and announcing) any that fail to start.
    async fn advance(&mut self) {
        match self.session.as_mut() {
            Some(session) => session.finish(),
            None => return,
        }

        while let Some(track) = self.context.queues.dequeue_front(self.guild_id) {
            match self.start_track(track.clone()).await {
                Ok(title) => {
                    self.announce(NoticeKind::NowPlaying { title });
                    return;
                }
                Err(err) => {
                    error!("Failed to play queued track '{}' in guild {}: {}", track, self.guild_id, err);
                    let reason = match err {
                        MusicError::ResolutionError(reason) | MusicError::TransportError(reason) => reason,
                        other => other.to_string(),
                    };
                    self.announce(NoticeKind::PlaybackFailed { track, reason });
                }
            }
        }

        info!("No more tracks in queue for guild {}", self.guild_id);
    }

    /// Resolve and stream a track, returning its display title.
    async fn start_track(&mut self, track: TrackReference) -> MusicResult<String> {
        let resolved = self.resolve(&track).await?;
        let token = self.issue_token();
        let signal = FinishedSignal::new(token, self.events.clone());

        let session = self.session.as_mut().ok_or(MusicError::NoActiveConnection)?;
        self.context
            .transport
            .start_streaming(&session.connection, &resolved.stream_url, signal)
            .await?;

        info!("Now playing '{}' in guild {}", resolved.title, self.guild_id);
        session.begin(track, resolved.title.clone(), token);
        Ok(resolved.title)
    }

    async fn resolve(&self, track: &TrackReference) -> MusicResult<ResolvedTrack> {
        let resolution = self.context.resolver.resolve(track);
        match self.context.resolve_timeout {
            Some(limit) => tokio::time::timeout(limit, resolution).await.map_err(|_| {
                MusicError::ResolutionError(format!(
                    "timed out after {}",
                    humantime::format_duration(limit)
                ))
            })?,
            None => resolution.await,
        }
    }

    fn issue_token(&mut self) -> TrackToken {
        self.next_token += 1;
        TrackToken(self.next_token)
    }

    fn announce(&self, kind: NoticeKind) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let notice = Notice {
            channel_id: session.announce_channel(),
            kind,
        };
        if self.context.notices.send(notice).is_err() {
            debug!("Notice receiver closed for guild {}", self.guild_id);
        }
    }
}
