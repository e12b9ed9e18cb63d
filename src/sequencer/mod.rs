// Sequencer module - Musical time helpers used by the renderer

pub mod metronome;
pub mod tempo;

pub use metronome::{Click, ClickType, MetronomeScheduler};
pub use tempo::{MAX_BPM, MIN_BPM, Tempo};
