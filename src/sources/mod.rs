//! # Sources Module
//!
//! Turns what a user typed into something the audio output can stream.
//!
//! The [`TrackResolver`] trait is the seam: the dispatcher only sees a
//! [`Track`] or a [`ResolveError`]. The production implementation,
//! [`youtube::YtDlpResolver`], shells out to `yt-dlp`; tests mock the trait.
//!
//! Resolution rules:
//!
//! - Direct `http(s)` links are handed to the extractor unchanged
//! - Anything else is treated as free text and gets the `ytsearch:` prefix
//! - Every failure (network, timeout, no results, malformed metadata) is a
//!   [`ResolveError`]; callers report all of them as "not found"

pub mod youtube;

use async_trait::async_trait;

use crate::{audio::queue::Track, error::ResolveError};

pub use youtube::YtDlpResolver;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError>;
}

/// Devuelve la consulta lista para el extractor: links directos tal cual,
/// texto libre con prefijo de búsqueda.
pub fn search_target(query: &str) -> String {
    let query = query.trim();
    if is_direct_link(query) {
        query.to_string()
    } else {
        format!("ytsearch:{query}")
    }
}

pub fn is_direct_link(query: &str) -> bool {
    url::Url::parse(query)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn free_text_gets_search_prefix() {
        assert_eq!(search_target("  daft punk  "), "ytsearch:daft punk");
        assert_eq!(search_target("lucio drop the beat"), "ytsearch:lucio drop the beat");
    }

    #[test]
    fn links_pass_through() {
        assert_eq!(
            search_target("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert!(is_direct_link("http://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn non_http_schemes_are_searched() {
        assert!(!is_direct_link("ftp://example.com/song.mp3"));
        assert!(!is_direct_link("mailto:dj@example.com"));
        assert_eq!(search_target("file:///etc/passwd"), "ytsearch:file:///etc/passwd");
    }
}
