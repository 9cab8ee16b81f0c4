use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

fn all_commands() -> Vec<CreateCommand> {
    vec![
        help_command(),
        play_command(),
        queue_command(),
        skip_command(),
        pause_command(),
        resume_command(),
        stop_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Show Lucio's command list")
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song or add to queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Song name or URL")
                .required(true),
        )
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show current queue")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip current song")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause playback")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume playback")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop the bot")
}
