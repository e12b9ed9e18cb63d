// Session configuration - RON (or JSON) file describing the link session setup

use std::fs;
use std::path::Path;

use log::debug;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, LinkResult, validate_bpm, validate_quantum};
use crate::link::clock::{ClockMapping, NANOS_PER_SECOND};
use crate::link::engine_data::DEFAULT_QUANTUM;
use crate::sequencer::tempo::DEFAULT_BPM;

/// Setup parameters for a [`LinkManager`](crate::link::LinkManager)
///
/// Missing fields fall back to their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Tempo for a freshly created local session
    pub initial_bpm: f64,
    pub quantum: f64,
    pub sample_rate: f64,
    /// Host time units per second
    pub seconds_to_host_time: f64,
    /// Hardware output latency reported by the audio device
    pub output_latency_seconds: f64,
    pub start_stop_sync: bool,
    /// Capacity of the audio -> control event ring buffer
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            initial_bpm: DEFAULT_BPM,
            quantum: DEFAULT_QUANTUM,
            sample_rate: 48000.0,
            seconds_to_host_time: NANOS_PER_SECOND,
            output_latency_seconds: 0.0,
            start_stop_sync: true,
            event_capacity: 64,
        }
    }
}

impl LinkConfig {
    pub fn from_ron_str(text: &str) -> LinkResult<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> LinkResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk; `.json` files are read as JSON, everything else as RON
    pub fn load(path: impl AsRef<Path>) -> LinkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!("Loading link config from {}", path.display());

        if is_json(path) {
            Self::from_json_str(&text)
        } else {
            Self::from_ron_str(&text)
        }
    }

    pub fn to_ron_string(&self) -> LinkResult<String> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> LinkResult<()> {
        let path = path.as_ref();
        let text = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            self.to_ron_string()?
        };
        fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> LinkResult<()> {
        validate_bpm(self.initial_bpm)?;
        validate_quantum(self.quantum)?;
        self.clock()?;
        if !(self.output_latency_seconds.is_finite() && self.output_latency_seconds >= 0.0) {
            return Err(LinkError::InvalidConfig(format!(
                "output latency must be >= 0 seconds, got {}",
                self.output_latency_seconds
            )));
        }
        if self.event_capacity == 0 {
            return Err(LinkError::InvalidConfig(
                "event capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn clock(&self) -> LinkResult<ClockMapping> {
        ClockMapping::new(self.sample_rate, self.seconds_to_host_time)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
