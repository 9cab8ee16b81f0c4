//! Fakes for the audio and chat seams, plus a harness wiring them to a
//! [`MusicPlayer`]. Test-only.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::{
    audio::{
        output::{AudioOutput, Completion, PlayerEvent},
        player::{MusicPlayer, PlayRequest},
        queue::Track,
        session::{GuildStore, PlaybackState},
    },
    bot::chat::ChatPlatform,
    error::{MusicError, MusicResult, ResolveError},
    sources::MockTrackResolver,
};

pub const GUILD: GuildId = GuildId::new(1);
pub const VOICE: ChannelId = ChannelId::new(100);
pub const TEXT: ChannelId = ChannelId::new(200);
pub const USER: UserId = UserId::new(300);

struct Current {
    track: Track,
    paused: bool,
    done: Completion,
}

#[derive(Default)]
pub struct OutputState {
    connected: HashSet<GuildId>,
    current: HashMap<GuildId, Current>,
    failing: HashSet<String>,
    pub played: Vec<String>,
    pub pause_calls: usize,
    pub resume_calls: usize,
    pub disconnects: usize,
}

/// Salida de audio en memoria. Cada `play` exitoso guarda su token y lo
/// dispara una sola vez: en `stop`, `disconnect`, al reemplazarlo o con
/// [`FakeOutput::finish`].
#[derive(Default)]
pub struct FakeOutput {
    state: Mutex<OutputState>,
}

impl FakeOutput {
    pub fn state(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock()
    }

    pub fn now_playing(&self, guild_id: GuildId) -> Option<String> {
        self.state
            .lock()
            .current
            .get(&guild_id)
            .map(|c| c.track.title.clone())
    }

    pub fn is_paused(&self, guild_id: GuildId) -> bool {
        self.state
            .lock()
            .current
            .get(&guild_id)
            .is_some_and(|c| c.paused)
    }

    /// El track termina solo
    pub fn finish(&self, guild_id: GuildId) {
        let current = self.state.lock().current.remove(&guild_id);
        if let Some(current) = current {
            current.done.fire();
        }
    }

    /// `play` falla para este título
    pub fn fail_on(&self, title: &str) {
        self.state.lock().failing.insert(title.to_string());
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn connect(&self, guild_id: GuildId, _channel_id: ChannelId) -> MusicResult<()> {
        self.state.lock().connected.insert(guild_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        let current = {
            let mut state = self.state.lock();
            state.connected.remove(&guild_id);
            state.disconnects += 1;
            state.current.remove(&guild_id)
        };
        if let Some(current) = current {
            current.done.fire();
        }
        Ok(())
    }

    fn is_connected(&self, guild_id: GuildId) -> bool {
        self.state.lock().connected.contains(&guild_id)
    }

    async fn play(&self, guild_id: GuildId, track: &Track, done: Completion) -> MusicResult<()> {
        let replaced = {
            let mut state = self.state.lock();
            if !state.connected.contains(&guild_id) {
                return Err(MusicError::NotConnected(guild_id));
            }
            if state.failing.contains(&track.title) {
                return Err(MusicError::Playback(format!("cannot open {}", track.title)));
            }
            state.played.push(track.title.clone());
            state.current.insert(
                guild_id,
                Current {
                    track: track.clone(),
                    paused: false,
                    done,
                },
            )
        };
        if let Some(replaced) = replaced {
            replaced.done.fire();
        }
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        let current = self.state.lock().current.remove(&guild_id);
        if let Some(current) = current {
            current.done.fire();
        }
    }

    async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        let mut state = self.state.lock();
        state.pause_calls += 1;
        let current = state
            .current
            .get_mut(&guild_id)
            .ok_or(MusicError::NothingPlaying(guild_id))?;
        current.paused = true;
        Ok(())
    }

    async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        let mut state = self.state.lock();
        state.resume_calls += 1;
        let current = state
            .current
            .get_mut(&guild_id)
            .ok_or(MusicError::NothingPlaying(guild_id))?;
        current.paused = false;
        Ok(())
    }

    async fn state(&self, guild_id: GuildId) -> PlaybackState {
        match self.state.lock().current.get(&guild_id) {
            Some(current) if current.paused => PlaybackState::Paused,
            Some(_) => PlaybackState::Playing,
            None => PlaybackState::Idle,
        }
    }
}

#[derive(Default, Debug)]
pub struct ChatLog {
    next_id: u64,
    live: HashSet<MessageId>,
    pub sent: Vec<(ChannelId, MessageId, String)>,
    pub edits: Vec<(MessageId, String)>,
    pub failed_edits: usize,
    pub deleted: Vec<MessageId>,
    pub reactions: Vec<(MessageId, String)>,
    pub removed_reactions: Vec<(MessageId, UserId, String)>,
}

impl ChatLog {
    pub fn sent_texts(&self) -> Vec<&str> {
        self.sent.iter().map(|(_, _, text)| text.as_str()).collect()
    }
}

/// Chat en memoria. Editar o borrar un mensaje que no existe falla como en Discord.
#[derive(Default)]
pub struct FakeChat {
    log: Mutex<ChatLog>,
}

impl FakeChat {
    pub fn log(&self) -> MutexGuard<'_, ChatLog> {
        self.log.lock()
    }

    /// Alguien borró el mensaje por fuera del bot
    pub fn forget(&self, message_id: MessageId) {
        self.log.lock().live.remove(&message_id);
    }

    /// Registra un mensaje que existía antes del test
    pub fn adopt(&self, message_id: MessageId) {
        self.log.lock().live.insert(message_id);
    }

    fn unknown_message() -> MusicError {
        MusicError::Discord(serenity::Error::Other("Unknown Message"))
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> MusicResult<MessageId> {
        let mut log = self.log.lock();
        log.next_id += 1;
        let message_id = MessageId::new(1_000 + log.next_id);
        log.live.insert(message_id);
        log.sent.push((channel_id, message_id, content.to_string()));
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> MusicResult<()> {
        let mut log = self.log.lock();
        if !log.live.contains(&message_id) {
            log.failed_edits += 1;
            return Err(Self::unknown_message());
        }
        log.edits.push((message_id, content.to_string()));
        Ok(())
    }

    async fn delete_message(&self, _channel_id: ChannelId, message_id: MessageId) -> MusicResult<()> {
        let mut log = self.log.lock();
        if !log.live.remove(&message_id) {
            return Err(Self::unknown_message());
        }
        log.deleted.push(message_id);
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> MusicResult<()> {
        self.log.lock().reactions.push((message_id, emoji.to_string()));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> MusicResult<()> {
        self.log
            .lock()
            .removed_reactions
            .push((message_id, user_id, emoji.to_string()));
        Ok(())
    }
}

/// Resolver simulado: la consulta es el título; "missing" no existe
pub fn title_resolver() -> MockTrackResolver {
    let mut resolver = MockTrackResolver::new();
    resolver.expect_resolve().returning(|query| {
        if query == "missing" {
            Err(ResolveError::NoResults)
        } else {
            Ok(Track::new(format!("https://cdn.test/{query}"), query))
        }
    });
    resolver
}

pub fn request(query: &str) -> PlayRequest {
    PlayRequest {
        guild_id: GUILD,
        voice_channel: Some(VOICE),
        text_channel: TEXT,
        query: query.to_string(),
    }
}

pub struct Harness {
    pub player: Arc<MusicPlayer>,
    pub store: Arc<GuildStore>,
    pub output: Arc<FakeOutput>,
    pub chat: Arc<FakeChat>,
    events: UnboundedReceiver<PlayerEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_resolver(title_resolver())
    }

    pub fn with_resolver(resolver: MockTrackResolver) -> Self {
        let store = Arc::new(GuildStore::new());
        let output = Arc::new(FakeOutput::default());
        let chat = Arc::new(FakeChat::default());
        let (tx, events) = mpsc::unbounded_channel();

        let player = Arc::new(MusicPlayer::new(
            store.clone(),
            Arc::new(resolver),
            output.clone(),
            chat.clone(),
            Duration::from_millis(250),
            tx,
        ));

        Self {
            player,
            store,
            output,
            chat,
            events,
        }
    }

    /// Entrega al dispatcher los eventos de fin pendientes; devuelve cuántos hubo
    pub async fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events.try_recv() {
            self.player.handle_event(event).await;
            delivered += 1;
        }
        delivered
    }

    pub fn queued_titles(&self) -> Vec<String> {
        self.player
            .show_queue(GUILD)
            .into_iter()
            .map(|t| t.title)
            .collect()
    }
}
