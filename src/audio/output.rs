use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client as HttpClient;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::HttpRequest,
    tracks::{PlayMode, TrackHandle},
    Event, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::{
    audio::{queue::Track, session::PlaybackState},
    bot::events::TrackEndNotifier,
    error::{MusicError, MusicResult},
};

/// Eventos que el audio devuelve al loop del dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    TrackEnded { guild_id: GuildId, generation: u64 },
}

/// One-shot completion token for a single `play` call.
///
/// Consuming `fire` is the only way to emit the event, so a token can signal at
/// most once; audio outputs are expected to fire it exactly once, when the
/// track ends, errors, or is stopped.
#[derive(Debug)]
pub struct Completion {
    guild_id: GuildId,
    generation: u64,
    events: UnboundedSender<PlayerEvent>,
}

impl Completion {
    pub fn new(guild_id: GuildId, generation: u64, events: UnboundedSender<PlayerEvent>) -> Self {
        Self {
            guild_id,
            generation,
            events,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fire(self) {
        let event = PlayerEvent::TrackEnded {
            guild_id: self.guild_id,
            generation: self.generation,
        };
        if self.events.send(event).is_err() {
            // El loop de eventos ya terminó (shutdown)
            debug!("Evento de fin descartado para guild {}", self.guild_id);
        }
    }
}

/// Salida de audio hacia el canal de voz de cada guild
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()>;

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;

    fn is_connected(&self, guild_id: GuildId) -> bool;

    /// Empieza a reproducir `track`. Si devuelve `Ok`, `done` se dispara
    /// exactamente una vez; si devuelve `Err`, el token se descarta sin disparar.
    async fn play(&self, guild_id: GuildId, track: &Track, done: Completion) -> MusicResult<()>;

    /// Detiene el track actual. Idempotente.
    async fn stop(&self, guild_id: GuildId);

    async fn pause(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn resume(&self, guild_id: GuildId) -> MusicResult<()>;

    async fn state(&self, guild_id: GuildId) -> PlaybackState;
}

/// [`AudioOutput`] backed by songbird voice connections.
pub struct SongbirdOutput {
    manager: Arc<Songbird>,
    http: HttpClient,
    current_tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdOutput {
    pub fn new(manager: Arc<Songbird>, http: HttpClient) -> Self {
        Self {
            manager,
            http,
            current_tracks: DashMap::new(),
        }
    }

    fn current(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.current_tracks.get(&guild_id).map(|h| h.clone())
    }
}

#[async_trait]
impl AudioOutput for SongbirdOutput {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::Join(e.to_string()))?;

        let mut handler = call.lock().await;
        if !handler.is_deaf() {
            if let Err(e) = handler.deafen(true).await {
                warn!("No se pudo ensordecer en guild {}: {:?}", guild_id, e);
            }
        }

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        if let Some((_, track)) = self.current_tracks.remove(&guild_id) {
            let _ = track.stop();
        }

        if self.manager.get(guild_id).is_some() {
            self.manager
                .remove(guild_id)
                .await
                .map_err(|e| MusicError::Join(e.to_string()))?;
            info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        }

        Ok(())
    }

    fn is_connected(&self, guild_id: GuildId) -> bool {
        self.manager.get(guild_id).is_some()
    }

    async fn play(&self, guild_id: GuildId, track: &Track, done: Completion) -> MusicResult<()> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or(MusicError::NotConnected(guild_id))?;

        let input = HttpRequest::new(self.http.clone(), track.source.clone());
        let handle = {
            let mut handler = call.lock().await;
            handler.play_only_input(input.into())
        };

        // Fin natural, stop() y errores comparten el mismo token
        let notifier = TrackEndNotifier::new(done);
        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| MusicError::Playback(e.to_string()))?;
        }

        info!("🎵 Reproduciendo: {} en guild {}", track.title, guild_id);
        self.current_tracks.insert(guild_id, handle);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        if let Some((_, track)) = self.current_tracks.remove(&guild_id) {
            let _ = track.stop();
            debug!("⏹️ Track detenido en guild {}", guild_id);
        }
    }

    async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        let track = self
            .current(guild_id)
            .ok_or(MusicError::NothingPlaying(guild_id))?;
        track
            .pause()
            .map_err(|e| MusicError::Playback(e.to_string()))?;
        info!("⏸️ Reproducción pausada en guild {}", guild_id);
        Ok(())
    }

    async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        let track = self
            .current(guild_id)
            .ok_or(MusicError::NothingPlaying(guild_id))?;
        track
            .play()
            .map_err(|e| MusicError::Playback(e.to_string()))?;
        info!("▶️ Reproducción reanudada en guild {}", guild_id);
        Ok(())
    }

    async fn state(&self, guild_id: GuildId) -> PlaybackState {
        let Some(track) = self.current(guild_id) else {
            return PlaybackState::Idle;
        };

        match track.get_info().await {
            Ok(info) => match info.playing {
                PlayMode::Play => PlaybackState::Playing,
                PlayMode::Pause => PlaybackState::Paused,
                _ => PlaybackState::Idle,
            },
            // El driver ya soltó el track
            Err(_) => PlaybackState::Idle,
        }
    }
}
