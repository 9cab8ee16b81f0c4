//! Texto que ve el usuario, con la voz del DJ.

use crate::{audio::queue::Track, error::MusicError};

/// Máximo de tracks que muestra `/queue`
pub const QUEUE_DISPLAY_LIMIT: usize = 8;

pub fn lucio_say(message: &str) -> String {
    format!("🎶 **LÚCIO:** {message} 🎧")
}

pub fn now_dropping(track: &Track) -> String {
    lucio_say(&format!("New track dropping! **{}** 🎵", track.title))
}

pub fn added_to_queue(track: &Track, position: usize) -> String {
    lucio_say(&format!("Added to lineup: **{}** (#{position}) ➕", track.title))
}

pub fn queue_empty() -> String {
    lucio_say("Queue empty! Time for an encore? 🎤")
}

pub fn skipped() -> String {
    lucio_say("Skipping track! Next beat dropping! ⏭️")
}

pub fn paused(changed: bool) -> String {
    if changed {
        lucio_say("Music paused! Catch your breath... ⏸️")
    } else {
        lucio_say("Already on a breather! ⏸️")
    }
}

pub fn resumed(changed: bool) -> String {
    if changed {
        lucio_say("And we're back! Let's go! ▶️")
    } else {
        lucio_say("The beat never stopped! ▶️")
    }
}

pub fn stopped() -> String {
    lucio_say("Shutting down! Keep the rhythm alive! 🎶")
}

pub fn farewell() -> String {
    lucio_say("Peace out! Catch you on the flip side! ✌️")
}

/// Lista 1-indexada para `/queue`
pub fn queue_listing(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return lucio_say("No tracks in the lineup! Time to drop some beats! 🎧");
    }

    let listing = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| format!("**{}.** {}", i + 1, track.title))
        .collect::<Vec<_>>()
        .join("\n");

    lucio_say(&format!("Current Mix Lineup:\n{listing}"))
}

/// Convierte un error en la respuesta que ve el usuario
pub fn describe_error(error: &MusicError) -> String {
    match error {
        MusicError::NotFound(_) => lucio_say("Track not found! Let's try another vibe? 🎛️"),
        MusicError::NotInVoice => lucio_say("Hey! Jump in the mix channel first! 🎧"),
        MusicError::NothingPlaying(_) => lucio_say("Nothing's dropping right now! 🔇"),
        MusicError::NoSession(_) | MusicError::NotConnected(_) => {
            lucio_say("I'm not in the mix right now! 🔇")
        }
        MusicError::Join(_) => lucio_say("Couldn't get into your channel! Check my permissions? 🔒"),
        MusicError::Playback(_) | MusicError::Discord(_) => {
            lucio_say("Something scratched the record! Try again? 💿")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn queue_listing_is_one_indexed() {
        let tracks = vec![Track::new("b://", "B"), Track::new("c://", "C")];
        assert_eq!(
            queue_listing(&tracks),
            "🎶 **LÚCIO:** Current Mix Lineup:\n**1.** B\n**2.** C 🎧"
        );
    }

    #[test]
    fn empty_queue_listing() {
        assert!(queue_listing(&[]).contains("No tracks in the lineup"));
    }

    #[test]
    fn not_found_has_its_own_message() {
        let message = describe_error(&MusicError::NotFound("zzz".into()));
        assert!(message.contains("Track not found"));
    }
}
