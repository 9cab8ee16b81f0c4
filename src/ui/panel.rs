//! The standing control-panel message.
//!
//! One message per guild shows what is playing and what comes next, with four
//! reaction controls under it. The panel is a convenience view: when the
//! message disappears or an edit is refused, the failure is logged and the
//! reference dropped, and the next track start posts a fresh panel.
//!
//! Refreshes are debounced per guild. [`ControlPanel::schedule_refresh`]
//! aborts a refresh that has not started yet and replaces it, so a burst of
//! state changes (enqueue followed by play-next, pause toggles) produces a
//! single edit showing the final state.

use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{
    audio::session::{GuildSession, GuildStore, PanelRef, PlaybackState},
    bot::chat::ChatPlatform,
    error::{MusicError, MusicResult},
    ui::messages::lucio_say,
};

/// Próximos tracks que muestra el panel
const UPCOMING_LIMIT: usize = 3;

/// Controles del panel, en el orden en que se agregan como reacciones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelControl {
    PlayPause,
    Skip,
    Stop,
    Refresh,
}

impl PanelControl {
    pub const ALL: [PanelControl; 4] = [
        PanelControl::PlayPause,
        PanelControl::Skip,
        PanelControl::Stop,
        PanelControl::Refresh,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            PanelControl::PlayPause => "⏯️",
            PanelControl::Skip => "⏭️",
            PanelControl::Stop => "⏹️",
            PanelControl::Refresh => "🔄",
        }
    }

    pub fn from_emoji(emoji: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|control| control.emoji() == emoji)
    }
}

/// Lo que muestra el panel, copiado de la sesión
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelView {
    pub now_playing: Option<String>,
    pub paused: bool,
    pub upcoming: Vec<String>,
}

impl PanelView {
    pub fn from_session(session: &GuildSession) -> Self {
        Self {
            now_playing: session.now_playing.as_ref().map(|t| t.title.clone()),
            paused: session.playback == PlaybackState::Paused,
            upcoming: session
                .queue
                .preview(UPCOMING_LIMIT)
                .into_iter()
                .map(|t| t.title)
                .collect(),
        }
    }
}

pub fn render(view: &PanelView) -> String {
    let mut content = lucio_say("**Live Mix Control Panel** 🎛️");
    content.push_str("\n\n");

    match &view.now_playing {
        Some(title) if view.paused => {
            content.push_str(&format!("**Now Dropping:** {title} *(paused)*\n\n"))
        }
        Some(title) => content.push_str(&format!("**Now Dropping:** {title}\n\n")),
        None => content.push_str("**Silent moment...**\n\n"),
    }

    let legend = PanelControl::ALL
        .iter()
        .map(|control| control.emoji())
        .collect::<Vec<_>>()
        .join(" ");
    content.push_str(&format!("**Track Controls:** {legend}\n"));

    if view.upcoming.is_empty() {
        content.push_str("**Queue is clear!**\n");
    } else {
        content.push_str("**Next in line:**\n");
        for title in &view.upcoming {
            content.push_str(&format!("▸ {title}\n"));
        }
    }

    content.push_str("\n*Let's turn up the beats!* 🎶");
    content
}

pub struct ControlPanel {
    store: Arc<GuildStore>,
    chat: Arc<dyn ChatPlatform>,
    debounce: Duration,
    pending: DashMap<GuildId, (u64, AbortHandle)>,
    next_ticket: AtomicU64,
}

impl ControlPanel {
    pub fn new(store: Arc<GuildStore>, chat: Arc<dyn ChatPlatform>, debounce: Duration) -> Self {
        Self {
            store,
            chat,
            debounce,
            pending: DashMap::new(),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Publica un panel nuevo en `channel_id` y lo registra en la sesión.
    ///
    /// Si ya había un panel, el anterior se borra: un solo panel por guild.
    pub async fn create(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<PanelRef> {
        let view = self
            .store
            .with_session(guild_id, |session| PanelView::from_session(session))
            .ok_or(MusicError::NoSession(guild_id))?;

        let message_id = self.chat.send_message(channel_id, &render(&view)).await?;
        let panel = PanelRef {
            channel_id,
            message_id,
        };

        // La sesión pudo desaparecer mientras se enviaba el mensaje
        let previous = self
            .store
            .with_session(guild_id, |session| session.control_panel.replace(panel));
        match previous {
            None => {
                self.delete(panel).await;
                return Err(MusicError::NoSession(guild_id));
            }
            Some(Some(old)) => self.delete(old).await,
            Some(None) => {}
        }

        for control in PanelControl::ALL {
            if let Err(e) = self
                .chat
                .add_reaction(channel_id, message_id, control.emoji())
                .await
            {
                warn!("No se pudo agregar {} al panel: {}", control.emoji(), e);
            }
        }

        info!("🎛️ Panel creado en guild {} (mensaje {})", guild_id, message_id);
        Ok(panel)
    }

    /// Re-renderiza y edita el panel ahora mismo.
    ///
    /// Devuelve `true` si hubo edición. Sin panel registrado no hace nada.
    pub async fn refresh(&self, guild_id: GuildId) -> bool {
        let snapshot = self
            .store
            .with_session(guild_id, |session| {
                session
                    .control_panel
                    .map(|panel| (panel, PanelView::from_session(session)))
            })
            .flatten();

        let Some((panel, view)) = snapshot else {
            debug!("Sin panel que refrescar en guild {}", guild_id);
            return false;
        };

        match self
            .chat
            .edit_message(panel.channel_id, panel.message_id, &render(&view))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "⚠️ No se pudo editar el panel {} en guild {}: {}",
                    panel.message_id, guild_id, e
                );
                self.store.with_session(guild_id, |session| {
                    if session.control_panel == Some(panel) {
                        session.control_panel = None;
                    }
                });
                false
            }
        }
    }

    /// Programa un refresh con debounce, reemplazando el que esté pendiente
    pub fn schedule_refresh(self: &Arc<Self>, guild_id: GuildId) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let panel = Arc::clone(self);

        let task = tokio::spawn(async move {
            tokio::time::sleep(panel.debounce).await;
            // A partir de aquí ya no se cancela: una edición en curso termina
            panel.pending.remove_if(&guild_id, |_, (t, _)| *t == ticket);
            panel.refresh(guild_id).await;
        });

        if let Some((_, previous)) = self.pending.insert(guild_id, (ticket, task.abort_handle())) {
            previous.abort();
        }
    }

    /// Cancela el refresh pendiente del guild, si hay uno
    pub fn cancel(&self, guild_id: GuildId) {
        if let Some((_, (_, pending))) = self.pending.remove(&guild_id) {
            pending.abort();
        }
    }

    pub async fn delete(&self, panel: PanelRef) {
        if let Err(e) = self
            .chat
            .delete_message(panel.channel_id, panel.message_id)
            .await
        {
            warn!("No se pudo borrar el panel {}: {}", panel.message_id, e);
        }
    }
}
