use parking_lot::Mutex;
use serenity::async_trait;
use songbird::{Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler};
use std::sync::Arc;
use tracing::{debug, error};

use crate::audio::output::Completion;

/// Handler para el fin de un track (natural, por stop() o por error).
///
/// Se registra para `TrackEvent::End` y `TrackEvent::Error` con el mismo token;
/// el primero que llega lo consume.
#[derive(Clone)]
pub struct TrackEndNotifier {
    done: Arc<Mutex<Option<Completion>>>,
}

impl TrackEndNotifier {
    pub fn new(done: Completion) -> Self {
        Self {
            done: Arc::new(Mutex::new(Some(done))),
        }
    }
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _handle) in *tracks {
                if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                    error!("❌ Error en track: {:?}", e);
                }
            }
        }

        let done = self.done.lock().take();
        match done {
            Some(done) => {
                debug!("🎵 Track terminado (generación {})", done.generation());
                done.fire();
            }
            None => debug!("Fin de track ya notificado"),
        }

        None
    }
}
