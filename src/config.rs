use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Inactividad
    pub inactivity_check_interval: Duration,
    pub idle_timeout: Duration,

    // Panel de control
    pub panel_refresh_debounce: Duration,

    // Resolver (yt-dlp)
    pub resolver_timeout: Duration,
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Construye la configuración a partir de una función de búsqueda de variables.
    ///
    /// `load()` la usa con el entorno del proceso; los tests pasan un mapa.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let duration = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(val) if !val.trim().is_empty() => humantime::parse_duration(val.trim())
                    .with_context(|| format!("{key} no es una duración válida: {val}")),
                _ => Ok(default),
            }
        };

        Ok(Self {
            discord_token: lookup("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,
            guild_id: match lookup("GUILD_ID") {
                Some(val) if !val.trim().is_empty() => Some(
                    val.trim()
                        .parse()
                        .with_context(|| format!("GUILD_ID inválido: {val}"))?,
                ),
                _ => None,
            },

            inactivity_check_interval: duration(
                "INACTIVITY_CHECK_INTERVAL",
                defaults.inactivity_check_interval,
            )?,
            idle_timeout: duration("IDLE_TIMEOUT", defaults.idle_timeout)?,
            panel_refresh_debounce: duration(
                "PANEL_REFRESH_DEBOUNCE",
                defaults.panel_refresh_debounce,
            )?,
            resolver_timeout: duration("RESOLVER_TIMEOUT", defaults.resolver_timeout)?,
            ytdlp_path: lookup("YTDLP_PATH")
                .filter(|val| !val.trim().is_empty())
                .unwrap_or(defaults.ytdlp_path),
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The token must not be empty
    /// - Every duration must be greater than zero
    /// - The panel debounce must be shorter than the inactivity check interval,
    ///   otherwise a panel refresh could be pending across a whole sweep
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        for (name, value) in [
            ("INACTIVITY_CHECK_INTERVAL", self.inactivity_check_interval),
            ("IDLE_TIMEOUT", self.idle_timeout),
            ("PANEL_REFRESH_DEBOUNCE", self.panel_refresh_debounce),
            ("RESOLVER_TIMEOUT", self.resolver_timeout),
        ] {
            if value.is_zero() {
                anyhow::bail!("{name} must be greater than 0");
            }
        }

        if self.panel_refresh_debounce >= self.inactivity_check_interval {
            anyhow::bail!(
                "PANEL_REFRESH_DEBOUNCE ({}) must be shorter than INACTIVITY_CHECK_INTERVAL ({})",
                humantime::format_duration(self.panel_refresh_debounce),
                humantime::format_duration(self.inactivity_check_interval)
            );
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Commands: {}\n  \
            Inactivity: check every {}, leave after {}\n  \
            Panel: debounce {}\n  \
            Resolver: {} (timeout {})",
            self.guild_id
                .map_or("global".to_string(), |id| format!("guild {id}")),
            humantime::format_duration(self.inactivity_check_interval),
            humantime::format_duration(self.idle_timeout),
            humantime::format_duration(self.panel_refresh_debounce),
            self.ytdlp_path,
            humantime::format_duration(self.resolver_timeout),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            guild_id: None,

            inactivity_check_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),

            panel_refresh_debounce: Duration::from_millis(250),

            resolver_timeout: Duration::from_secs(10),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}
