use std::collections::VecDeque;
use tracing::{debug, info};

/// A resolved, playable reference: where to stream from and what to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Stream locator handed to the audio output (direct media URL)
    pub source: String,
    pub title: String,
}

impl Track {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
        }
    }
}

/// Cola FIFO de tracks pendientes. Sin límite de tamaño.
#[derive(Debug, Default)]
pub struct MusicQueue {
    items: VecDeque<Track>,
}

impl MusicQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final y devuelve su posición (1-indexada)
    pub fn enqueue(&mut self, track: Track) -> usize {
        info!("➕ Agregado a la cola: {}", track.title);
        self.items.push_back(track);
        self.items.len()
    }

    /// Saca el siguiente track (FIFO)
    pub fn pop_next(&mut self) -> Option<Track> {
        let next = self.items.pop_front();
        match &next {
            Some(track) => debug!("➡️ Siguiente en cola: {}", track.title),
            None => debug!("📭 Cola vacía, no hay siguiente track"),
        }
        next
    }

    pub fn clear(&mut self) {
        self.items.clear();
        info!("🗑️ Cola limpiada");
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Los primeros `limit` tracks, en orden de reproducción
    pub fn preview(&self, limit: usize) -> Vec<Track> {
        self.items.iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn operates_in_arrival_order() {
        let mut queue = MusicQueue::new();
        assert_eq!(queue.enqueue(Track::new("a://", "A")), 1);
        assert_eq!(queue.enqueue(Track::new("b://", "B")), 2);
        assert_eq!(queue.enqueue(Track::new("c://", "C")), 3);

        assert_eq!(titles(&queue.preview(1)), vec!["A"]);
        assert_eq!(queue.pop_next().unwrap().title, "A");
        assert_eq!(titles(&queue.preview(8)), vec!["B", "C"]);
    }

    #[test]
    fn preview_is_capped() {
        let mut queue = MusicQueue::new();
        for i in 0..12 {
            queue.enqueue(Track::new(format!("s{i}"), format!("T{i}")));
        }

        let preview = queue.preview(8);
        assert_eq!(preview.len(), 8);
        assert_eq!(preview[7].title, "T7");
        assert_eq!(queue.len(), 12);
    }

    #[test]
    fn clear_and_pop_on_empty() {
        let mut queue = MusicQueue::new();
        queue.enqueue(Track::new("a://", "A"));
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.pop_next(), None);
        assert!(queue.preview(1).is_empty());
    }
}
