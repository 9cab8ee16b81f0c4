use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        output::{AudioOutput, Completion, PlayerEvent},
        queue::Track,
        session::{GuildSession, GuildStore, PlaybackState},
    },
    bot::chat::ChatPlatform,
    error::{MusicError, MusicResult},
    sources::TrackResolver,
    ui::{
        messages::{self, QUEUE_DISPLAY_LIMIT},
        panel::{ControlPanel, PanelControl},
    },
};

#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    /// Canal de voz del usuario que pidió el track, si está en uno
    pub voice_channel: Option<ChannelId>,
    pub text_channel: ChannelId,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started(Track),
    Queued { track: Track, position: usize },
}

/// Resultado de revisar la inactividad de un guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleVerdict {
    /// Sin conexión de voz o sin sesión: nada que vigilar
    Untracked,
    Busy,
    Idle { remaining: Duration },
    Evicted,
}

/// Command dispatcher: the only writer of guild sessions.
///
/// Every public operation that mutates a guild takes that guild's operation
/// lock first, so commands, reactions, completion events and the inactivity
/// monitor never interleave on the same guild. Different guilds run in
/// parallel.
///
/// Playback advances through completion events: each started track carries a
/// generation number, and only the event matching the session's current
/// generation moves the queue forward. Stopping a track (skip, stop,
/// replacement) therefore never advances twice.
pub struct MusicPlayer {
    store: Arc<GuildStore>,
    resolver: Arc<dyn TrackResolver>,
    output: Arc<dyn AudioOutput>,
    chat: Arc<dyn ChatPlatform>,
    panel: Arc<ControlPanel>,
    events: UnboundedSender<PlayerEvent>,
}

impl MusicPlayer {
    pub fn new(
        store: Arc<GuildStore>,
        resolver: Arc<dyn TrackResolver>,
        output: Arc<dyn AudioOutput>,
        chat: Arc<dyn ChatPlatform>,
        panel_debounce: Duration,
        events: UnboundedSender<PlayerEvent>,
    ) -> Self {
        let panel = Arc::new(ControlPanel::new(store.clone(), chat.clone(), panel_debounce));

        Self {
            store,
            resolver,
            output,
            chat,
            panel,
            events,
        }
    }

    pub fn store(&self) -> &Arc<GuildStore> {
        &self.store
    }

    pub fn panel(&self) -> &Arc<ControlPanel> {
        &self.panel
    }

    /// Loop de eventos: recibe los fines de track desde el driver de audio
    pub async fn run(
        self: Arc<Self>,
        mut events: UnboundedReceiver<PlayerEvent>,
        shutdown: CancellationToken,
    ) {
        info!("🎧 Loop de eventos del reproductor iniciado");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        let player = self.clone();
                        tokio::spawn(async move { player.handle_event(event).await });
                    }
                    None => break,
                },
            }
        }

        info!("Loop de eventos del reproductor detenido");
    }

    pub async fn handle_event(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackEnded {
                guild_id,
                generation,
            } => self.on_track_end(guild_id, generation).await,
        }
    }

    async fn on_track_end(&self, guild_id: GuildId, generation: u64) {
        let _guard = self.store.lock(guild_id).await;

        let current = self
            .store
            .with_session(guild_id, |session| session.finish(generation))
            .unwrap_or(false);
        if !current {
            debug!(
                "Fin de track ignorado en guild {} (generación {} vieja)",
                guild_id, generation
            );
            return;
        }

        self.advance(guild_id, true).await;
    }

    /// Resuelve `query`, lo encola y empieza a reproducir si no hay nada sonando
    pub async fn play(&self, request: PlayRequest) -> MusicResult<PlayOutcome> {
        let PlayRequest {
            guild_id,
            voice_channel,
            text_channel,
            query,
        } = request;

        self.store.touch(guild_id, Instant::now());
        let voice_channel = voice_channel.ok_or(MusicError::NotInVoice)?;

        // Sin lock: una búsqueda lenta no bloquea skip/stop del mismo guild
        let track = self.resolver.resolve(&query).await.map_err(|e| {
            warn!("🔍 Sin resultados para '{}' en guild {}: {}", query, guild_id, e);
            MusicError::NotFound(query.clone())
        })?;

        let _guard = self.store.lock(guild_id).await;

        // Volver a mirar el estado: pudo cambiar mientras se resolvía
        if !self.output.is_connected(guild_id) {
            self.output.connect(guild_id, voice_channel).await?;
        }

        let idle = self.store.with_session_or_create(guild_id, |session| {
            session.text_channel = Some(text_channel);
            session.last_activity = Instant::now();
            session.playback == PlaybackState::Idle
        });
        let position = self.store.enqueue(guild_id, track.clone());

        if !idle {
            self.panel.schedule_refresh(guild_id);
            return Ok(PlayOutcome::Queued { track, position });
        }

        self.advance(guild_id, false).await;

        self.store
            .with_session(guild_id, |session| session.now_playing.clone())
            .flatten()
            .map(PlayOutcome::Started)
            .ok_or_else(|| MusicError::Playback(format!("could not start {}", track.title)))
    }

    /// Pasa al siguiente track de la cola. Requiere el lock del guild.
    ///
    /// Los tracks que no arrancan se saltan. Con `announce`, el cambio se
    /// anuncia en el canal de texto de la sesión.
    async fn advance(&self, guild_id: GuildId, announce: bool) {
        // Si algo sigue sonando, su evento de fin queda viejo y se ignora
        self.output.stop(guild_id).await;

        loop {
            if !self.output.is_connected(guild_id) {
                warn!("🔌 Sin conexión de voz en guild {}, no se avanza", guild_id);
                self.store.with_session(guild_id, GuildSession::set_idle);
                return;
            }

            let Some(next) = self.store.with_session(guild_id, GuildSession::start_next) else {
                return;
            };

            let Some((track, generation)) = next else {
                info!("📭 Cola vacía en guild {}", guild_id);
                self.panel.schedule_refresh(guild_id);
                if announce {
                    self.announce(guild_id, &messages::queue_empty()).await;
                }
                return;
            };

            let done = Completion::new(guild_id, generation, self.events.clone());
            match self.output.play(guild_id, &track, done).await {
                Ok(()) => {
                    if announce {
                        self.announce(guild_id, &messages::now_dropping(&track)).await;
                    }
                    self.show_panel(guild_id).await;
                    return;
                }
                Err(e) => {
                    warn!("❌ No se pudo reproducir '{}' en guild {}: {}", track.title, guild_id, e);
                }
            }
        }
    }

    /// Refresca el panel existente o publica uno nuevo
    async fn show_panel(&self, guild_id: GuildId) {
        let (panel, channel) = self
            .store
            .with_session(guild_id, |session| (session.control_panel, session.text_channel))
            .unwrap_or((None, None));

        match (panel, channel) {
            (Some(_), _) => self.panel.schedule_refresh(guild_id),
            (None, Some(channel_id)) => {
                if let Err(e) = self.panel.create(guild_id, channel_id).await {
                    warn!("No se pudo crear el panel en guild {}: {}", guild_id, e);
                }
            }
            (None, None) => debug!("Guild {} sin canal de texto para el panel", guild_id),
        }
    }

    async fn announce(&self, guild_id: GuildId, content: &str) {
        let channel = self
            .store
            .with_session(guild_id, |session| session.text_channel)
            .flatten();
        if let Some(channel_id) = channel {
            self.announce_to(channel_id, content).await;
        }
    }

    async fn announce_to(&self, channel_id: ChannelId, content: &str) {
        if let Err(e) = self.chat.send_message(channel_id, content).await {
            warn!("Error al enviar mensaje al canal {}: {}", channel_id, e);
        }
    }

    /// Detiene el track actual; el evento de fin se encarga de avanzar
    pub async fn skip(&self, guild_id: GuildId) -> MusicResult<Track> {
        let _guard = self.store.lock(guild_id).await;

        let current = self
            .store
            .with_session(guild_id, |session| match session.playback {
                PlaybackState::Idle => None,
                _ => session.now_playing.clone(),
            })
            .flatten()
            .ok_or(MusicError::NothingPlaying(guild_id))?;

        self.output.stop(guild_id).await;
        info!("⏭️ Saltando '{}' en guild {}", current.title, guild_id);
        Ok(current)
    }

    /// Devuelve `true` si la reproducción se pausó, `false` si ya estaba pausada
    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<bool> {
        let _guard = self.store.lock(guild_id).await;
        self.set_paused(guild_id, true).await
    }

    /// Devuelve `true` si la reproducción se reanudó, `false` si ya sonaba
    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<bool> {
        let _guard = self.store.lock(guild_id).await;
        self.set_paused(guild_id, false).await
    }

    /// Pausa o reanuda según el estado actual (botón ⏯️)
    pub async fn toggle_pause(&self, guild_id: GuildId) -> MusicResult<PlaybackState> {
        let _guard = self.store.lock(guild_id).await;

        let pause = self.store.playback(guild_id) == PlaybackState::Playing;
        self.set_paused(guild_id, pause).await?;
        Ok(self.store.playback(guild_id))
    }

    async fn set_paused(&self, guild_id: GuildId, pause: bool) -> MusicResult<bool> {
        let target = if pause {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };

        match self.store.playback(guild_id) {
            PlaybackState::Idle => return Err(MusicError::NothingPlaying(guild_id)),
            state if state == target => return Ok(false),
            _ => {}
        }

        if pause {
            self.output.pause(guild_id).await?;
        } else {
            self.output.resume(guild_id).await?;
        }

        self.store
            .with_session(guild_id, |session| session.playback = target);
        self.panel.schedule_refresh(guild_id);
        Ok(true)
    }

    /// Desconecta, limpia la cola y borra el panel
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let _guard = self.store.lock(guild_id).await;

        if !self.store.contains(guild_id) && !self.output.is_connected(guild_id) {
            return Err(MusicError::NoSession(guild_id));
        }

        self.teardown(guild_id).await;
        Ok(())
    }

    /// El bot salió del canal de voz por fuera (kick, canal borrado)
    pub async fn handle_disconnect(&self, guild_id: GuildId) {
        let _guard = self.store.lock(guild_id).await;

        if self.store.contains(guild_id) {
            info!("🔌 Bot desconectado externamente en guild {}", guild_id);
            self.teardown(guild_id).await;
        }
    }

    /// Destruye la sesión. Requiere el lock del guild.
    async fn teardown(&self, guild_id: GuildId) -> Option<GuildSession> {
        self.panel.cancel(guild_id);

        // Primero la sesión: cualquier evento de fin posterior queda viejo
        let mut session = self.store.remove(guild_id);
        if let Some(session) = session.as_mut() {
            let pending = session.queue.len();
            session.queue.clear();
            if pending > 0 {
                debug!("{} tracks pendientes descartados en guild {}", pending, guild_id);
            }
        }

        self.output.stop(guild_id).await;
        if let Err(e) = self.output.disconnect(guild_id).await {
            warn!("Error al desconectar en guild {}: {}", guild_id, e);
        }

        if let Some(panel) = session.as_ref().and_then(|s| s.control_panel) {
            self.panel.delete(panel).await;
        }

        info!("⏹️ Sesión terminada en guild {}", guild_id);
        session
    }

    /// Los primeros tracks pendientes (sin contar el que suena)
    pub fn show_queue(&self, guild_id: GuildId) -> Vec<Track> {
        self.store.queue_preview(guild_id, QUEUE_DISPLAY_LIMIT)
    }

    /// Aplica una reacción sobre un panel. Mensajes que no son panel se ignoran.
    pub async fn apply_control(&self, message_id: MessageId, user_id: UserId, control: PanelControl) {
        let Some(guild_id) = self.store.guild_for_panel(message_id) else {
            debug!("Reacción en mensaje {} que no es un panel", message_id);
            return;
        };
        let Some(panel) = self.store.panel(guild_id) else {
            return;
        };

        debug!("🎛️ Control {:?} en guild {} por {}", control, guild_id, user_id);

        let result = match control {
            PanelControl::PlayPause => self.toggle_pause(guild_id).await.map(|_| ()),
            PanelControl::Skip => self.skip(guild_id).await.map(|_| ()),
            PanelControl::Stop => {
                // El panel se borra con la sesión; no hay reacción que quitar
                if let Err(e) = self.stop(guild_id).await {
                    debug!("Stop desde el panel sin efecto en guild {}: {}", guild_id, e);
                }
                return;
            }
            PanelControl::Refresh => {
                self.panel.schedule_refresh(guild_id);
                Ok(())
            }
        };

        if let Err(e) = result {
            debug!("Control {:?} sin efecto en guild {}: {}", control, guild_id, e);
        }

        if let Err(e) = self
            .chat
            .remove_reaction(panel.channel_id, panel.message_id, user_id, control.emoji())
            .await
        {
            warn!("No se pudo quitar la reacción {} del panel: {}", control.emoji(), e);
        }
    }

    /// Revisa un guild para el monitor de inactividad.
    ///
    /// Ocupado (sonando, pausado o con cola) renueva la actividad; inactivo por
    /// más de `idle_timeout` se desconecta y se despide.
    pub async fn check_idle(&self, guild_id: GuildId, now: Instant, idle_timeout: Duration) -> IdleVerdict {
        if !self.output.is_connected(guild_id) {
            return IdleVerdict::Untracked;
        }

        let _guard = self.store.lock(guild_id).await;

        let audio_busy = self.output.state(guild_id).await != PlaybackState::Idle;
        let Some((busy, last_activity)) = self
            .store
            .with_session(guild_id, |session| (session.is_busy(), session.last_activity))
        else {
            return IdleVerdict::Untracked;
        };

        if audio_busy || busy {
            self.store.touch(guild_id, now);
            return IdleVerdict::Busy;
        }

        let idle_for = now.saturating_duration_since(last_activity);
        if idle_for <= idle_timeout {
            return IdleVerdict::Idle {
                remaining: idle_timeout - idle_for,
            };
        }

        info!(
            "💤 Guild {} inactivo por {}, desconectando",
            guild_id,
            humantime::format_duration(Duration::from_secs(idle_for.as_secs()))
        );

        let session = self.teardown(guild_id).await;
        if let Some(channel_id) = session.and_then(|s| s.text_channel) {
            self.announce_to(channel_id, &messages::farewell()).await;
        }

        IdleVerdict::Evicted
    }
}
