//! Error taxonomy shared by the dispatcher, the collaborators and the handlers.
//!
//! Every variant is recoverable: handlers turn them into a log line or a short
//! message for the user (see [`crate::ui::messages::describe_error`]) and the
//! event loop keeps running.

use serenity::model::id::GuildId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    /// El resolver no devolvió nada reproducible
    #[error("no track found for `{0}`")]
    NotFound(String),

    #[error("user is not in a voice channel")]
    NotInVoice,

    #[error("nothing is playing in guild {0}")]
    NothingPlaying(GuildId),

    #[error("no active session in guild {0}")]
    NoSession(GuildId),

    #[error("not connected to voice in guild {0}")]
    NotConnected(GuildId),

    #[error("could not join voice channel: {0}")]
    Join(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("discord request failed: {0}")]
    Discord(#[from] serenity::Error),
}

/// Fallos del resolver. Para el usuario todos terminan en "not found".
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("extractor timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("could not run extractor: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("extractor failed: {0}")]
    Extractor(String),

    #[error("malformed extractor output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no results")]
    NoResults,
}

pub type MusicResult<T> = Result<T, MusicError>;
