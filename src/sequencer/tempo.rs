// Tempo - BPM value and the range a tempo session accepts

use std::fmt;

use crate::error::{LinkResult, validate_bpm};

/// Slowest tempo a session accepts
pub const MIN_BPM: f64 = 20.0;
/// Fastest tempo a session accepts
pub const MAX_BPM: f64 = 999.0;
pub const DEFAULT_BPM: f64 = 120.0;

/// Tempo in BPM (Beats Per Minute), always within [`MIN_BPM`, `MAX_BPM`]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a tempo, rejecting non-finite or non-positive values and
    /// clamping the rest into the session range
    pub fn new(bpm: f64) -> LinkResult<Self> {
        let bpm = validate_bpm(bpm)?;
        Ok(Self::clamped(bpm))
    }

    /// Clamp into the session range; NaN falls back to the default tempo
    pub fn clamped(bpm: f64) -> Self {
        if bpm.is_nan() {
            return Self::default();
        }
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Beats elapsed over `seconds` at this tempo
    pub fn beats_in(&self, seconds: f64) -> f64 {
        seconds * self.bpm / 60.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: DEFAULT_BPM }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} BPM", self.bpm)
    }
}
