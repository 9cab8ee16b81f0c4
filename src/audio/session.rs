//! Per-guild session state and the keyed store that owns it.
//!
//! [`GuildStore`] is the only place sessions live. Map guards never escape the
//! store: every access goes through a short synchronous closure, so nothing
//! holds a shard lock across an `.await`. Serialization of whole dispatcher
//! operations is a separate concern, handled by the per-guild async lock
//! returned from [`GuildStore::lock`].

use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    time::Instant,
};
use tracing::{debug, info};

use super::queue::{MusicQueue, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Mensaje del panel de control publicado en un canal de texto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug)]
pub struct GuildSession {
    pub queue: MusicQueue,
    pub now_playing: Option<Track>,
    pub playback: PlaybackState,
    /// Se incrementa con cada track iniciado; identifica a qué reproducción
    /// pertenece un evento de finalización.
    pub generation: u64,
    pub last_activity: Instant,
    /// Canal donde se anuncian tracks y se publica el panel
    pub text_channel: Option<ChannelId>,
    pub control_panel: Option<PanelRef>,
}

impl GuildSession {
    pub fn new(now: Instant) -> Self {
        Self {
            queue: MusicQueue::new(),
            now_playing: None,
            playback: PlaybackState::Idle,
            generation: 0,
            last_activity: now,
            text_channel: None,
            control_panel: None,
        }
    }

    /// Mueve la cabeza de la cola al slot "now playing".
    ///
    /// Devuelve el track y la generación nueva, o `None` si la cola está vacía
    /// (en cuyo caso la sesión queda en `Idle`).
    pub fn start_next(&mut self) -> Option<(Track, u64)> {
        match self.queue.pop_next() {
            Some(track) => {
                self.generation += 1;
                self.now_playing = Some(track.clone());
                self.playback = PlaybackState::Playing;
                Some((track, self.generation))
            }
            None => {
                self.set_idle();
                None
            }
        }
    }

    /// Marca como terminada la reproducción `generation`.
    ///
    /// Devuelve `false` si el evento es viejo (otra reproducción ya empezó o la
    /// sesión quedó inactiva).
    pub fn finish(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.playback == PlaybackState::Idle {
            return false;
        }
        self.set_idle();
        true
    }

    pub fn set_idle(&mut self) {
        self.now_playing = None;
        self.playback = PlaybackState::Idle;
    }

    /// Algo sonando, pausado o en cola
    pub fn is_busy(&self) -> bool {
        self.playback != PlaybackState::Idle || !self.queue.is_empty()
    }
}

#[derive(Default)]
pub struct GuildStore {
    sessions: DashMap<GuildId, GuildSession>,
    locks: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl GuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock de operaciones del guild: un solo escritor por guild a la vez.
    pub async fn lock(&self, guild_id: GuildId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(guild_id).or_default().clone();
        lock.lock_owned().await
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub fn with_session<R>(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&mut GuildSession) -> R,
    ) -> Option<R> {
        self.sessions
            .get_mut(&guild_id)
            .map(|mut session| f(&mut session))
    }

    /// Igual que [`with_session`](Self::with_session) pero crea la sesión si no existe
    pub fn with_session_or_create<R>(
        &self,
        guild_id: GuildId,
        f: impl FnOnce(&mut GuildSession) -> R,
    ) -> R {
        let mut session = self.sessions.entry(guild_id).or_insert_with(|| {
            debug!("🆕 Nueva sesión para guild {}", guild_id);
            GuildSession::new(Instant::now())
        });
        f(&mut session)
    }

    pub fn enqueue(&self, guild_id: GuildId, track: Track) -> usize {
        self.with_session_or_create(guild_id, |session| session.queue.enqueue(track))
    }

    pub fn touch(&self, guild_id: GuildId, now: Instant) {
        self.with_session(guild_id, |session| session.last_activity = now);
    }

    pub fn queue_preview(&self, guild_id: GuildId, limit: usize) -> Vec<Track> {
        self.with_session(guild_id, |session| session.queue.preview(limit))
            .unwrap_or_default()
    }

    pub fn playback(&self, guild_id: GuildId) -> PlaybackState {
        self.with_session(guild_id, |session| session.playback)
            .unwrap_or_default()
    }

    pub fn panel(&self, guild_id: GuildId) -> Option<PanelRef> {
        self.with_session(guild_id, |session| session.control_panel)
            .flatten()
    }

    /// Busca el guild dueño de un mensaje de panel
    pub fn guild_for_panel(&self, message_id: MessageId) -> Option<GuildId> {
        self.sessions.iter().find_map(|entry| {
            entry
                .control_panel
                .filter(|panel| panel.message_id == message_id)
                .map(|_| *entry.key())
        })
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Destruye la sesión del guild y la devuelve
    pub fn remove(&self, guild_id: GuildId) -> Option<GuildSession> {
        let removed = self.sessions.remove(&guild_id).map(|(_, session)| session);
        if removed.is_some() {
            info!("🧹 Sesión eliminada para guild {}", guild_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const GUILD: GuildId = GuildId::new(1);

    #[test]
    fn session_is_created_lazily_by_enqueue() {
        let store = GuildStore::new();
        assert!(!store.contains(GUILD));

        store.enqueue(GUILD, Track::new("a://", "A"));
        assert!(store.contains(GUILD));
        assert_eq!(store.queue_preview(GUILD, 1)[0].title, "A");
    }

    #[test]
    fn store_enqueue_reports_positions_in_order() {
        let store = GuildStore::new();

        let positions: Vec<usize> = ["A", "B", "C"]
            .into_iter()
            .map(|title| store.enqueue(GUILD, Track::new(format!("{title}://"), title)))
            .collect();

        assert_eq!(positions, vec![1, 2, 3]);
        let titles: Vec<String> = store
            .queue_preview(GUILD, 8)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn start_next_moves_head_into_now_playing() {
        let mut session = GuildSession::new(Instant::now());
        session.queue.enqueue(Track::new("a://", "A"));
        session.queue.enqueue(Track::new("b://", "B"));

        let (track, generation) = session.start_next().unwrap();
        assert_eq!(track.title, "A");
        assert_eq!(generation, 1);
        assert_eq!(session.now_playing.as_ref().unwrap().title, "A");
        assert_eq!(session.playback, PlaybackState::Playing);
        assert_eq!(session.queue.len(), 1);
    }

    #[test]
    fn finish_ignores_stale_generations() {
        let mut session = GuildSession::new(Instant::now());
        session.queue.enqueue(Track::new("a://", "A"));
        session.queue.enqueue(Track::new("b://", "B"));
        session.start_next();
        session.start_next();

        assert!(!session.finish(1));
        assert!(session.finish(2));
        // Un segundo evento para la misma reproducción ya no cuenta
        assert!(!session.finish(2));
        assert_eq!(session.playback, PlaybackState::Idle);
    }

    #[test]
    fn start_next_on_empty_queue_goes_idle() {
        let mut session = GuildSession::new(Instant::now());
        session.playback = PlaybackState::Playing;
        session.now_playing = Some(Track::new("a://", "A"));

        assert!(session.start_next().is_none());
        assert_eq!(session.playback, PlaybackState::Idle);
        assert!(session.now_playing.is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn panel_lookup_and_removal() {
        let store = GuildStore::new();
        let panel = PanelRef {
            channel_id: ChannelId::new(10),
            message_id: MessageId::new(20),
        };
        store.with_session_or_create(GUILD, |session| session.control_panel = Some(panel));

        assert_eq!(store.guild_for_panel(MessageId::new(20)), Some(GUILD));
        assert_eq!(store.guild_for_panel(MessageId::new(21)), None);

        let removed = store.remove(GUILD).unwrap();
        assert_eq!(removed.control_panel, Some(panel));
        assert_eq!(store.guild_for_panel(MessageId::new(20)), None);
        assert_eq!(store.panel(GUILD), None);
    }

    #[tokio::test]
    async fn operation_lock_serializes_per_guild() {
        let store = Arc::new(GuildStore::new());
        let guard = store.lock(GUILD).await;

        let other = store.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock(GUILD).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // Otro guild no espera
        let _other_guild = store.lock(GuildId::new(2)).await;

        drop(guard);
        waiter.await.unwrap();
    }
}
