use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{search_target, TrackResolver};
use crate::{audio::queue::Track, config::Config, error::ResolveError};

const UNKNOWN_TRACK_TITLE: &str = "Unknown track";

/// Resolver que consulta yt-dlp sin descargar nada
pub struct YtDlpResolver {
    ytdlp_path: String,
    timeout: Duration,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp (`--dump-single-json`)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            timeout: config.resolver_timeout,
            rate_limiter: Semaphore::new(3),
        }
    }

    async fn run(&self, target: &str) -> Result<String, ResolveError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolveError::Extractor(e.to_string()))?;

        let socket_timeout = self.timeout.as_secs().max(1).to_string();
        let mut command = Command::new(&self.ytdlp_path);
        command
            .args([
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--no-check-certificates",
                "--geo-bypass",
                "--force-ipv4",
                "--format",
                "bestaudio/best",
                "--default-search",
                "ytsearch",
                "--socket-timeout",
                socket_timeout.as_str(),
                "--",
                target,
            ])
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))??;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Extractor(error.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
        let target = search_target(query);
        info!("🔍 Resolviendo: {}", target);

        let stdout = self.run(&target).await.inspect_err(|e| {
            warn!("❌ yt-dlp falló para '{}': {}", query, e);
        })?;

        let track = parse_info(&stdout)?;
        debug!("✅ Resuelto '{}' -> {}", query, track.title);
        Ok(track)
    }
}

/// Convierte la salida JSON de yt-dlp en un [`Track`].
///
/// Las búsquedas vienen como playlist con `entries`; los links directos como
/// un único video.
fn parse_info(stdout: &str) -> Result<Track, ResolveError> {
    let info: YtDlpInfo = serde_json::from_str(stdout.trim())?;

    let info = match info.entries {
        Some(entries) => entries.into_iter().next().ok_or(ResolveError::NoResults)?,
        None => info,
    };

    let source = info
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ResolveError::Extractor("missing stream url".to_string()))?;
    let title = info
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_TRACK_TITLE.to_string());

    Ok(Track { source, title })
}
