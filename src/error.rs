// Error types - Control-thread validation and session lifecycle failures
// The audio path never produces errors: a missed pull is the expected non-blocking outcome

use thiserror::Error;

/// Errors reported to the control thread
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Invalid tempo: {0} BPM (must be finite and > 0)")]
    InvalidTempo(f64),

    #[error("Invalid beat time: {0} (must be finite and >= 0)")]
    InvalidBeatTime(f64),

    #[error("Invalid quantum: {0} (must be finite and > 0)")]
    InvalidQuantum(f64),

    #[error("Invalid clock mapping: {0}")]
    InvalidClock(String),

    #[error("Audio engine is running; stop it before changing clock parameters")]
    EngineRunning,

    #[error("Audio engine is not running")]
    EngineStopped,

    #[error("Audio link handle belongs to a different session")]
    ForeignAudioLink,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LinkResult<T> = Result<T, LinkError>;

/// Tempo proposals must be finite and strictly positive
pub(crate) fn validate_bpm(bpm: f64) -> LinkResult<f64> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(LinkError::InvalidTempo(bpm))
    }
}

pub(crate) fn validate_beat_time(beat_time: f64) -> LinkResult<f64> {
    if beat_time.is_finite() && beat_time >= 0.0 {
        Ok(beat_time)
    } else {
        Err(LinkError::InvalidBeatTime(beat_time))
    }
}

pub(crate) fn validate_quantum(quantum: f64) -> LinkResult<f64> {
    if quantum.is_finite() && quantum > 0.0 {
        Ok(quantum)
    } else {
        Err(LinkError::InvalidQuantum(quantum))
    }
}
