use dashmap::DashMap;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::input::HttpRequest;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Event, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::{debug, info, warn};

use super::dispatcher::GuildEvent;
use super::event_handlers::SongEndNotifier;
use super::music_manager::{MusicError, MusicResult};

/// Identifies one started stream so that late end-of-track signals can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackToken(pub u64);

/// What the transport observes for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Idle,
    Playing,
    Paused,
}

/// An established voice connection. Owned by exactly one playback session.
#[derive(Debug, PartialEq, Eq)]
pub struct VoiceConnection {
    guild_id: GuildId,
    channel_id: ChannelId,
}

impl VoiceConnection {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Follow the bot after it was moved; the call itself stays up.
    pub fn move_to(&mut self, channel_id: ChannelId) {
        self.channel_id = channel_id;
    }
}

/// End-of-track notification for one stream.
///
/// Consumed on use, so a stream can report completion at most once. The signal is
/// posted onto the guild's event queue instead of touching player state directly.
pub struct FinishedSignal {
    token: TrackToken,
    events: WeakUnboundedSender<GuildEvent>,
}

impl FinishedSignal {
    pub fn new(token: TrackToken, events: WeakUnboundedSender<GuildEvent>) -> Self {
        Self { token, events }
    }

    pub fn token(&self) -> TrackToken {
        self.token
    }

    pub fn notify(self) {
        match self.events.upgrade() {
            Some(events) => {
                if events.send(GuildEvent::TrackFinished(self.token)).is_err() {
                    debug!("Guild worker gone, dropping finish signal {:?}", self.token);
                }
            }
            None => debug!("Guild worker gone, dropping finish signal {:?}", self.token),
        }
    }
}

/// The audio transport: joins voice channels and streams resolved URLs into them.
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<VoiceConnection>;

    async fn leave(&self, connection: VoiceConnection) -> MusicResult<()>;

    /// Start playing `stream_url`. `on_finished` fires once when the stream ends,
    /// whether naturally, on error, or because it was stopped.
    async fn start_streaming(
        &self,
        connection: &VoiceConnection,
        stream_url: &str,
        on_finished: FinishedSignal,
    ) -> MusicResult<()>;

    async fn pause(&self, connection: &VoiceConnection) -> MusicResult<()>;

    async fn resume(&self, connection: &VoiceConnection) -> MusicResult<()>;

    /// Stop the active stream. Succeeds when nothing is playing.
    async fn stop(&self, connection: &VoiceConnection) -> MusicResult<()>;

    async fn status(&self, connection: &VoiceConnection) -> TransportStatus;
}

/// [`TransportSink`] backed by songbird voice calls.
pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self {
            songbird,
            http,
            tracks: DashMap::new(),
        }
    }

    fn track(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.tracks.get(&guild_id).map(|handle| handle.clone())
    }
}

fn control_error(err: impl std::fmt::Display) -> MusicError {
    MusicError::TransportError(err.to_string())
}

#[async_trait]
impl TransportSink for SongbirdTransport {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<VoiceConnection> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::JoinError(e.to_string()))?;

        info!("Joined voice channel {} in guild {}", channel_id, guild_id);
        Ok(VoiceConnection::new(guild_id, channel_id))
    }

    async fn leave(&self, connection: VoiceConnection) -> MusicResult<()> {
        let guild_id = connection.guild_id();
        self.tracks.remove(&guild_id);

        if self.songbird.get(guild_id).is_none() {
            return Err(MusicError::NoActiveConnection);
        }

        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::JoinError(format!("failed to leave voice channel: {}", e)))?;

        info!("Left voice channel in guild {}", guild_id);
        Ok(())
    }

    async fn start_streaming(
        &self,
        connection: &VoiceConnection,
        stream_url: &str,
        on_finished: FinishedSignal,
    ) -> MusicResult<()> {
        let guild_id = connection.guild_id();
        let call = self
            .songbird
            .get(guild_id)
            .ok_or(MusicError::NoActiveConnection)?;

        // Never mix two streams on one call
        if let Some((_, previous)) = self.tracks.remove(&guild_id) {
            if let Err(e) = previous.stop() {
                debug!("Previous track in guild {} already ended: {}", guild_id, e);
            }
        }

        let input = HttpRequest::new(self.http.clone(), stream_url.to_string());
        let handle = {
            let mut handler = call.lock().await;
            handler.play_input(input.into())
        };

        let notifier = SongEndNotifier::new(on_finished);
        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(control_error)?;
        }

        self.tracks.insert(guild_id, handle);
        Ok(())
    }

    async fn pause(&self, connection: &VoiceConnection) -> MusicResult<()> {
        let handle = self
            .track(connection.guild_id())
            .ok_or(MusicError::NothingPlaying)?;
        handle.pause().map_err(control_error)
    }

    async fn resume(&self, connection: &VoiceConnection) -> MusicResult<()> {
        let handle = self
            .track(connection.guild_id())
            .ok_or(MusicError::NothingPaused)?;
        handle.play().map_err(control_error)
    }

    async fn stop(&self, connection: &VoiceConnection) -> MusicResult<()> {
        if let Some((_, handle)) = self.tracks.remove(&connection.guild_id()) {
            if let Err(e) = handle.stop() {
                warn!(
                    "Failed to stop track in guild {}: {}",
                    connection.guild_id(),
                    e
                );
            }
        }
        Ok(())
    }

    async fn status(&self, connection: &VoiceConnection) -> TransportStatus {
        let Some(handle) = self.track(connection.guild_id()) else {
            return TransportStatus::Idle;
        };

        match handle.get_info().await {
            Ok(state) => match state.playing {
                PlayMode::Play => TransportStatus::Playing,
                PlayMode::Pause => TransportStatus::Paused,
                _ => TransportStatus::Idle,
            },
            // The track has already been torn down
            Err(_) => TransportStatus::Idle,
        }
    }
}
