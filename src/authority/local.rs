// Local authority - Standalone single-peer tempo session
//
// The session state is written by one thread at a time (in practice the audio
// thread, through the renderer) and read from any thread without locks: a
// sequence counter brackets every write and readers retry on a torn read.

use std::hint;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering, fence};

use super::TimeAuthority;
use crate::sequencer::tempo::Tempo;

/// Linear beat timeline: `beat(t) = origin_beat + (t - origin_seconds) * bpm / 60`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub bpm: f64,
    pub origin_seconds: f64,
    pub origin_beat: f64,
}

impl Timeline {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: Tempo::clamped(bpm).bpm(),
            origin_seconds: 0.0,
            origin_beat: 0.0,
        }
    }

    pub fn beat_at(&self, seconds: f64) -> f64 {
        self.origin_beat + (seconds - self.origin_seconds) * self.bpm / 60.0
    }

    pub fn time_at_beat(&self, beat: f64) -> f64 {
        self.origin_seconds + (beat - self.origin_beat) * 60.0 / self.bpm
    }

    /// Same beat at `at_seconds`, new tempo from there on
    fn with_tempo(&self, bpm: f64, at_seconds: f64) -> Self {
        Self {
            bpm,
            origin_seconds: at_seconds,
            origin_beat: self.beat_at(at_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SessionState {
    timeline: Timeline,
    playing: bool,
    playing_since: f64,
}

/// f64 stored as bits in an AtomicU64
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

struct SessionCell {
    seq: AtomicU64,
    bpm: AtomicF64,
    origin_seconds: AtomicF64,
    origin_beat: AtomicF64,
    playing: AtomicBool,
    playing_since: AtomicF64,
}

impl SessionCell {
    fn new(state: SessionState) -> Self {
        Self {
            seq: AtomicU64::new(0),
            bpm: AtomicF64::new(state.timeline.bpm),
            origin_seconds: AtomicF64::new(state.timeline.origin_seconds),
            origin_beat: AtomicF64::new(state.timeline.origin_beat),
            playing: AtomicBool::new(state.playing),
            playing_since: AtomicF64::new(state.playing_since),
        }
    }

    fn read_fields(&self) -> SessionState {
        SessionState {
            timeline: Timeline {
                bpm: self.bpm.get(),
                origin_seconds: self.origin_seconds.get(),
                origin_beat: self.origin_beat.get(),
            },
            playing: self.playing.load(Ordering::Relaxed),
            playing_since: self.playing_since.get(),
        }
    }

    fn load(&self) -> SessionState {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 0 {
                let state = self.read_fields();
                fence(Ordering::Acquire);
                if self.seq.load(Ordering::Relaxed) == before {
                    return state;
                }
            }
            hint::spin_loop();
        }
    }

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        // Claim the odd sequence number; only contends if two threads write
        let mut current = self.seq.load(Ordering::Relaxed);
        loop {
            if current & 1 == 0 {
                match self.seq.compare_exchange_weak(
                    current,
                    current + 1,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(actual) => current = actual,
                }
            } else {
                hint::spin_loop();
                current = self.seq.load(Ordering::Relaxed);
            }
        }
        fence(Ordering::Release);

        let mut state = self.read_fields();
        f(&mut state);

        self.bpm.set(state.timeline.bpm);
        self.origin_seconds.set(state.timeline.origin_seconds);
        self.origin_beat.set(state.timeline.origin_beat);
        self.playing.store(state.playing, Ordering::Relaxed);
        self.playing_since.set(state.playing_since);

        self.seq.store(current + 2, Ordering::Release);
    }
}

/// Single-peer [`TimeAuthority`] with no network session
///
/// Tempo proposals are clamped into the session range and always accepted.
/// Quantum only affects phase queries since there are no peers to align with.
pub struct LocalAuthority {
    session: SessionCell,
    start_stop_sync: AtomicBool,
    enabled: AtomicBool,
}

impl LocalAuthority {
    pub fn new(bpm: f64) -> Self {
        Self {
            session: SessionCell::new(SessionState {
                timeline: Timeline::new(bpm),
                playing: false,
                playing_since: 0.0,
            }),
            start_stop_sync: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        }
    }

    /// Consistent copy of the current timeline
    pub fn timeline(&self) -> Timeline {
        self.session.load().timeline
    }

    /// Authority time at which the transport last changed play state
    pub fn playing_since(&self) -> f64 {
        self.session.load().playing_since
    }
}

impl Default for LocalAuthority {
    fn default() -> Self {
        Self::new(Tempo::default().bpm())
    }
}

impl TimeAuthority for LocalAuthority {
    fn current_tempo(&self) -> f64 {
        self.timeline().bpm
    }

    fn beat_at_time(&self, seconds: f64, _quantum: f64) -> f64 {
        self.timeline().beat_at(seconds)
    }

    fn propose_tempo(&self, bpm: f64, at_seconds: f64) {
        let bpm = Tempo::clamped(bpm).bpm();
        self.session.update(|state| {
            state.timeline = state.timeline.with_tempo(bpm, at_seconds);
        });
    }

    fn force_beat_at_time(&self, beat: f64, _quantum: f64, at_seconds: f64) {
        self.session.update(|state| {
            state.timeline.origin_seconds = at_seconds;
            state.timeline.origin_beat = beat;
        });
    }

    fn request_beat_at_start_playing_time(&self, beat: f64, _quantum: f64) {
        self.session.update(|state| {
            if state.playing {
                state.timeline.origin_seconds = state.playing_since;
                state.timeline.origin_beat = beat;
            }
        });
    }

    fn set_is_playing(&self, playing: bool, at_seconds: f64) {
        self.session.update(|state| {
            if state.playing != playing {
                state.playing = playing;
                state.playing_since = at_seconds;
            }
        });
    }

    fn is_playing(&self) -> bool {
        self.session.load().playing
    }

    fn set_start_stop_sync_enabled(&self, enabled: bool) {
        self.start_stop_sync.store(enabled, Ordering::Relaxed);
    }

    fn is_start_stop_sync_enabled(&self) -> bool {
        self.start_stop_sync.load(Ordering::Relaxed)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}
