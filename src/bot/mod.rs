//! # Bot Module
//!
//! Discord side of Lucio.
//!
//! [`LucioBot`] implements Serenity's [`EventHandler`] and translates gateway
//! events into [`MusicPlayer`] operations:
//!
//! - Slash commands go through [`handlers::handle_command`]
//! - Reactions on a control panel become [`PanelControl`](crate::ui::panel::PanelControl) actions
//! - The bot's own voice disconnect tears the guild session down
//!
//! The chat seam ([`chat`]) and the songbird track-end handler ([`events`])
//! also live here.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Reaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod chat;
pub mod commands;
pub mod events;
pub mod handlers;
pub mod reactions;

use crate::{audio::player::MusicPlayer, config::Config};

/// Main Discord event handler.
pub struct LucioBot {
    config: Arc<Config>,
    pub player: Arc<MusicPlayer>,
}

impl LucioBot {
    pub fn new(config: Arc<Config>, player: Arc<MusicPlayer>) -> Self {
        Self { config, player }
    }

    /// Registers slash commands with Discord.
    ///
    /// Guild commands (when `GUILD_ID` is set) show up almost immediately and
    /// are meant for development; global commands can take up to an hour.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for LucioBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎧 {} is live!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let bot_id = ctx.cache.current_user().id;
        let Some(control) = reactions::parse(&reaction, bot_id) else {
            return;
        };

        self.player
            .apply_control(control.message_id, control.user_id, control.control)
            .await;
    }

    /// Only the bot's own voice state matters: leaving the channel from outside
    /// (kick, channel deleted) ends the guild session.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id.or_else(|| old.and_then(|o| o.guild_id)) else {
            warn!("Desconexión de voz sin guild");
            return;
        };

        self.player.handle_disconnect(guild_id).await;
    }
}
