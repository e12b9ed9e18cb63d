// Time authority - Shared tempo/beat-phase service the engine follows
//
// The synchronization protocol itself lives behind this trait. The renderer
// calls the mutating operations from the audio thread only, with times produced
// by the clock mapping; the control thread sticks to the read-only queries.

pub mod local;

pub use local::LocalAuthority;

/// Tempo/phase authority (e.g. a network tempo session)
///
/// All times are in authority seconds. Implementations must be real-time safe
/// for the calls made from the audio thread: no blocking, no allocation.
pub trait TimeAuthority: Send + Sync {
    /// Current session tempo in BPM
    fn current_tempo(&self) -> f64;

    /// Beat value at `seconds`, aligned to `quantum`
    fn beat_at_time(&self, seconds: f64, quantum: f64) -> f64;

    /// Position within the quantum at `seconds`, in `[0, quantum)`
    fn phase_at_time(&self, seconds: f64, quantum: f64) -> f64 {
        self.beat_at_time(seconds, quantum).rem_euclid(quantum)
    }

    /// Propose a new session tempo taking effect at `at_seconds`
    fn propose_tempo(&self, bpm: f64, at_seconds: f64);

    /// Remap the timeline so that `beat` falls exactly at `at_seconds`
    fn force_beat_at_time(&self, beat: f64, quantum: f64, at_seconds: f64);

    /// Map `beat` onto the time transport started playing (no-op when stopped)
    fn request_beat_at_start_playing_time(&self, beat: f64, quantum: f64);

    /// Start or stop the shared transport at `at_seconds`
    fn set_is_playing(&self, playing: bool, at_seconds: f64);

    fn is_playing(&self) -> bool;

    fn set_start_stop_sync_enabled(&self, enabled: bool);

    fn is_start_stop_sync_enabled(&self) -> bool;

    /// Whether the authority participates in a session at all
    fn is_enabled(&self) -> bool {
        true
    }

    fn set_enabled(&self, _enabled: bool) {}

    /// Whether other peers are connected
    fn is_connected(&self) -> bool {
        false
    }
}
