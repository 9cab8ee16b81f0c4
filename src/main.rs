use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
#[cfg(test)]
mod testing;
mod ui;

use crate::audio::{
    inactivity::InactivityMonitor, output::SongbirdOutput, player::MusicPlayer,
    session::GuildStore,
};
use crate::bot::{chat::SerenityChat, LucioBot};
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lucio_bot=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎧 Iniciando Lucio v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    // Intents mínimos: comandos, estados de voz y reacciones del panel
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let songbird = Songbird::serenity();
    let chat = Arc::new(SerenityChat::new());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let player = Arc::new(MusicPlayer::new(
        Arc::new(GuildStore::new()),
        Arc::new(YtDlpResolver::new(&config)),
        Arc::new(SongbirdOutput::new(songbird.clone(), reqwest::Client::new())),
        chat.clone(),
        config.panel_refresh_debounce,
        events_tx,
    ));

    let handler = LucioBot::new(config.clone(), player.clone());

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Anuncios y panel comparten el cliente HTTP (y su rate limiter) con el gateway
    chat.attach(client.http.clone());

    let shutdown = CancellationToken::new();
    let event_loop = tokio::spawn(player.clone().run(events_rx, shutdown.clone()));
    let monitor = tokio::spawn(InactivityMonitor::new(player, &config).run(shutdown.clone()));

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        signal.cancel();
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    shutdown.cancel();
    let _ = tokio::join!(event_loop, monitor);
    info!("👋 Lucio detenido");

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    // Verificar dependencias críticas
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes: {}", config.ytdlp_path);
    }
}
