//! # Audio Module
//!
//! Per-guild playback for Lucio.
//!
//! ## Architecture
//!
//! ### [`session`] - Guild State
//! - One keyed store of guild sessions (queue, now playing, panel reference)
//! - Per-guild operation locks
//!
//! ### [`player`] - Command Dispatcher
//! - The only writer of guild sessions
//! - Advances the queue from completion events carrying a generation number
//!
//! ### [`output`] - Voice Output
//! - `AudioOutput` seam and its songbird implementation
//!
//! ### [`inactivity`] - Idle Monitor
//! - Periodic sweep that disconnects guilds left idle too long
//!
//! ### [`queue`] - FIFO of pending tracks

pub mod inactivity;
pub mod output;
pub mod player;
pub mod queue;
pub mod session;
