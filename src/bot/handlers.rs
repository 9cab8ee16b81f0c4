use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::player::{PlayOutcome, PlayRequest},
    bot::LucioBot,
    error::{MusicError, MusicResult},
    ui::{embeds, messages},
};

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &LucioBot) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return reply(ctx, &command, &messages::lucio_say("This mix only plays in servers! 🎧"), true).await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "help" => handle_help(ctx, &command).await,
        "play" => handle_play(ctx, &command, bot, guild_id).await,
        "queue" => {
            let tracks = bot.player.show_queue(guild_id);
            reply(ctx, &command, &messages::queue_listing(&tracks), false).await
        }
        "skip" => {
            let result = bot.player.skip(guild_id).await.map(|_| messages::skipped());
            respond(ctx, &command, result).await
        }
        "pause" => {
            let result = bot.player.pause(guild_id).await.map(messages::paused);
            respond(ctx, &command, result).await
        }
        "resume" => {
            let result = bot.player.resume(guild_id).await.map(messages::resumed);
            respond(ctx, &command, result).await
        }
        "stop" => {
            let result = bot.player.stop(guild_id).await.map(|_| messages::stopped());
            respond(ctx, &command, result).await
        }
        _ => reply(ctx, &command, "❌ Comando no reconocido", true).await,
    }
}

async fn handle_help(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embeds::create_help_embed()),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &LucioBot,
    guild_id: GuildId,
) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    if query.is_empty() {
        return respond(ctx, command, Err(MusicError::NotFound(query))).await;
    }

    // Antes del defer: el rechazo tiene que poder ir en privado
    let Some(voice_channel) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        return respond(ctx, command, Err(MusicError::NotInVoice)).await;
    };

    // Defer la respuesta ya que la búsqueda puede tomar tiempo
    command.defer(&ctx.http).await?;

    let request = PlayRequest {
        guild_id,
        voice_channel: Some(voice_channel),
        text_channel: command.channel_id,
        query,
    };

    let result = bot.player.play(request).await;
    if let Err(e) = &result {
        warn!("/play falló en guild {}: {}", guild_id, e);
    }

    let answer = Reply::for_play(result);
    if !answer.ephemeral {
        command
            .edit_response(&ctx.http, EditInteractionResponse::new().content(answer.content))
            .await?;
        return Ok(());
    }

    // Un defer público no se puede volver privado: se borra y se responde aparte
    command.delete_response(&ctx.http).await?;
    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(answer.content)
                .ephemeral(true),
        )
        .await?;

    Ok(())
}

/// Texto de respuesta y si va solo al usuario que ejecutó el comando
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    content: String,
    ephemeral: bool,
}

impl Reply {
    fn from_result(result: MusicResult<String>) -> Self {
        match result {
            Ok(content) => Self {
                content,
                ephemeral: false,
            },
            Err(e) => Self {
                content: messages::describe_error(&e),
                ephemeral: true,
            },
        }
    }

    fn for_play(result: MusicResult<PlayOutcome>) -> Self {
        Self::from_result(result.map(|outcome| match outcome {
            PlayOutcome::Started(track) => messages::now_dropping(&track),
            PlayOutcome::Queued { track, position } => messages::added_to_queue(&track, position),
        }))
    }
}

/// Responde con el mensaje de éxito, o con el error en privado
async fn respond(ctx: &Context, command: &CommandInteraction, result: MusicResult<String>) -> Result<()> {
    if let Err(e) = &result {
        info!("/{} rechazado: {}", command.data.name, e);
    }

    let answer = Reply::from_result(result);
    reply(ctx, command, &answer.content, answer.ephemeral).await
}

async fn reply(ctx: &Context, command: &CommandInteraction, content: &str, ephemeral: bool) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::Track;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejections_are_private() {
        for error in [
            MusicError::NotInVoice,
            MusicError::NotFound("zzz".into()),
            MusicError::NothingPlaying(GuildId::new(1)),
        ] {
            let expected = messages::describe_error(&error);
            assert_eq!(
                Reply::for_play(Err(error)),
                Reply {
                    content: expected,
                    ephemeral: true
                }
            );
        }
    }

    #[test]
    fn successful_play_is_public() {
        let track = Track::new("https://cdn.test/A", "A");

        let started = Reply::for_play(Ok(PlayOutcome::Started(track.clone())));
        assert_eq!(started.content, messages::now_dropping(&track));
        assert!(!started.ephemeral);

        let queued = Reply::for_play(Ok(PlayOutcome::Queued { track: track.clone(), position: 2 }));
        assert_eq!(queued.content, messages::added_to_queue(&track, 2));
        assert!(!queued.ephemeral);
    }

    #[test]
    fn command_results_share_the_same_rule() {
        assert!(!Reply::from_result(Ok(messages::skipped())).ephemeral);
        assert!(Reply::from_result(Err(MusicError::NoSession(GuildId::new(1)))).ephemeral);
    }
}
