// EngineData - Pending control-thread requests for the audio thread
// Plain Copy value: it crosses the guard as a single struct copy

/// Default beat-grouping quantum (one 4/4 bar)
pub const DEFAULT_QUANTUM: f64 = 4.0;

/// Start/stop latch resolved for one render cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRequest {
    Start,
    Stop,
}

/// Command buffer written by the control thread, consumed by the audio thread
///
/// `reset_to_beat_time`, `propose_bpm`, `request_start` and `request_stop` are
/// one-shot: the audio thread clears them in the live buffer when it pulls.
/// `output_latency` and `quantum` are persistent and re-applied every cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineData {
    /// Hardware output latency in host time units
    pub output_latency: u64,
    pub reset_to_beat_time: Option<f64>,
    pub request_start: bool,
    pub request_stop: bool,
    pub propose_bpm: Option<f64>,
    pub quantum: f64,
}

impl EngineData {
    pub fn new(output_latency: u64, quantum: f64) -> Self {
        Self {
            output_latency,
            reset_to_beat_time: None,
            request_start: false,
            request_stop: false,
            propose_bpm: None,
            quantum,
        }
    }

    /// Clear every one-shot field
    pub fn clear_one_shots(&mut self) {
        self.reset_to_beat_time = None;
        self.propose_bpm = None;
        self.request_start = false;
        self.request_stop = false;
    }

    /// Copy of this buffer carrying only the persistent fields
    pub fn persistent(&self) -> Self {
        let mut data = *self;
        data.clear_one_shots();
        data
    }

    /// Copy the whole buffer out, leaving the one-shots cleared behind
    pub fn take(&mut self) -> Self {
        let snapshot = *self;
        self.clear_one_shots();
        snapshot
    }

    pub fn has_one_shots(&self) -> bool {
        self.reset_to_beat_time.is_some()
            || self.propose_bpm.is_some()
            || self.request_start
            || self.request_stop
    }

    /// Resolve the start/stop latches; stop wins when both are set
    pub fn transport_request(&self) -> Option<TransportRequest> {
        if self.request_stop {
            Some(TransportRequest::Stop)
        } else if self.request_start {
            Some(TransportRequest::Start)
        } else {
            None
        }
    }
}

impl Default for EngineData {
    fn default() -> Self {
        Self::new(0, DEFAULT_QUANTUM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_requests() {
        let data = EngineData::default();
        assert!(!data.has_one_shots());
        assert_eq!(data.quantum, DEFAULT_QUANTUM);
        assert_eq!(data.transport_request(), None);
    }

    #[test]
    fn test_take_clears_one_shots_only() {
        let mut live = EngineData::new(512, 3.0);
        live.propose_bpm = Some(128.0);
        live.reset_to_beat_time = Some(0.0);
        live.request_start = true;

        let snapshot = live.take();

        assert_eq!(snapshot.propose_bpm, Some(128.0));
        assert_eq!(snapshot.reset_to_beat_time, Some(0.0));
        assert!(snapshot.request_start);

        assert!(!live.has_one_shots());
        assert_eq!(live.output_latency, 512);
        assert_eq!(live.quantum, 3.0);
    }

    #[test]
    fn test_stop_wins_over_start() {
        let mut data = EngineData::default();
        data.request_start = true;
        assert_eq!(data.transport_request(), Some(TransportRequest::Start));

        data.request_stop = true;
        assert_eq!(data.transport_request(), Some(TransportRequest::Stop));
    }

    #[test]
    fn test_beat_zero_is_a_real_request() {
        // 0.0 is a legal beat time and must not read as "no request"
        let mut data = EngineData::default();
        data.reset_to_beat_time = Some(0.0);
        assert!(data.has_one_shots());
        assert!(!data.persistent().has_one_shots());
    }
}
