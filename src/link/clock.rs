// Clock mapping - Host time <-> time authority seconds
// Both parameters are fixed for the duration of an audio session.
// LinkManager only lets them change while the engine is stopped.

use std::sync::OnceLock;
use std::time::Instant;

use crate::error::{LinkError, LinkResult};

/// Host units per second of the built-in monotonic clock (nanoseconds)
pub const NANOS_PER_SECOND: f64 = 1.0e9;

/// Conversion between the monotonic host-time domain and continuous seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockMapping {
    sample_rate: f64,
    seconds_to_host_time: f64,
}

impl ClockMapping {
    pub fn new(sample_rate: f64, seconds_to_host_time: f64) -> LinkResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(LinkError::InvalidClock(format!(
                "sample rate must be > 0, got {}",
                sample_rate
            )));
        }
        if !(seconds_to_host_time.is_finite() && seconds_to_host_time > 0.0) {
            return Err(LinkError::InvalidClock(format!(
                "seconds to host time must be > 0, got {}",
                seconds_to_host_time
            )));
        }
        Ok(Self {
            sample_rate,
            seconds_to_host_time,
        })
    }

    /// Build from a rational timebase (host tick = numer/denom nanoseconds)
    ///
    /// Host units per second = 1e9 * denom / numer
    pub fn from_timebase(sample_rate: f64, numer: u32, denom: u32) -> LinkResult<Self> {
        if numer == 0 || denom == 0 {
            return Err(LinkError::InvalidClock(format!(
                "timebase {}/{} has a zero term",
                numer, denom
            )));
        }
        Self::new(
            sample_rate,
            (NANOS_PER_SECOND * denom as f64) / numer as f64,
        )
    }

    /// Mapping for the nanosecond clock returned by [`host_time_now`]
    pub fn nanosecond_host(sample_rate: f64) -> LinkResult<Self> {
        Self::new(sample_rate, NANOS_PER_SECOND)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn seconds_to_host_time(&self) -> f64 {
        self.seconds_to_host_time
    }

    /// Host timestamp -> authority seconds
    #[inline]
    pub fn to_authority_time(&self, host_time: u64) -> f64 {
        host_time as f64 / self.seconds_to_host_time
    }

    /// Authority seconds -> host timestamp (negative times saturate to 0)
    #[inline]
    pub fn to_host_time(&self, seconds: f64) -> u64 {
        (seconds * self.seconds_to_host_time).round() as u64
    }

    /// Duration in seconds -> host units (hardware latency reporting)
    pub fn seconds_to_host_units(&self, seconds: f64) -> u64 {
        self.to_host_time(seconds)
    }

    /// Host units spanned by one audio frame
    #[inline]
    pub fn host_time_per_frame(&self) -> f64 {
        self.seconds_to_host_time / self.sample_rate
    }

    /// Host timestamp of `frame` within a buffer starting at `buffer_host_time`
    #[inline]
    pub fn host_time_at_frame(&self, buffer_host_time: u64, frame: usize) -> u64 {
        buffer_host_time.saturating_add((frame as f64 * self.host_time_per_frame()).round() as u64)
    }
}

impl Default for ClockMapping {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            seconds_to_host_time: NANOS_PER_SECOND,
        }
    }
}

/// Monotonic host clock in nanoseconds since first use in this process
pub fn host_time_now() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}
