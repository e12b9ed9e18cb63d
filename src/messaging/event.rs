// Transport events - Reported by the audio thread, drained by the control thread
// Copy-only payloads: pushing an event never allocates on the audio thread

/// Transport change observed by the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// Session tempo differs from the previous render cycle
    TempoChanged { bpm: f64, quantum: f64 },
    /// Transport started or stopped; `host_time` is the buffer start it was seen at
    PlayingChanged { playing: bool, host_time: u64 },
}

impl TransportEvent {
    pub fn is_tempo(&self) -> bool {
        matches!(self, TransportEvent::TempoChanged { .. })
    }

    pub fn is_playing_change(&self) -> bool {
        matches!(self, TransportEvent::PlayingChanged { .. })
    }
}
