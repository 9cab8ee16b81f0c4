use futures::future::join_all;
use serenity::model::id::GuildId;
use std::{sync::Arc, time::Duration};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    audio::player::{IdleVerdict, MusicPlayer},
    config::Config,
};

/// Tarea periódica que desconecta a los guilds sin actividad
pub struct InactivityMonitor {
    player: Arc<MusicPlayer>,
    check_interval: Duration,
    idle_timeout: Duration,
}

impl InactivityMonitor {
    pub fn new(player: Arc<MusicPlayer>, config: &Config) -> Self {
        Self {
            player,
            check_interval: config.inactivity_check_interval,
            idle_timeout: config.idle_timeout,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // El primer tick es inmediato
        ticker.tick().await;

        info!(
            "💤 Monitor de inactividad: revisión cada {}, límite {}",
            humantime::format_duration(self.check_interval),
            humantime::format_duration(self.idle_timeout)
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep(Instant::now()).await;
                }
            }
        }

        info!("Monitor de inactividad detenido");
    }

    /// Revisa todos los guilds con sesión; devuelve los desconectados
    pub async fn sweep(&self, now: Instant) -> Vec<GuildId> {
        let guilds = self.player.store().guild_ids();
        if guilds.is_empty() {
            return Vec::new();
        }

        let verdicts = join_all(guilds.into_iter().map(|guild_id| async move {
            let verdict = self
                .player
                .check_idle(guild_id, now, self.idle_timeout)
                .await;
            (guild_id, verdict)
        }))
        .await;

        let evicted: Vec<GuildId> = verdicts
            .into_iter()
            .filter_map(|(guild_id, verdict)| (verdict == IdleVerdict::Evicted).then_some(guild_id))
            .collect();

        if !evicted.is_empty() {
            debug!("Guilds desconectados por inactividad: {:?}", evicted);
        }
        evicted
    }
}
