// Shared test doubles for the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tempo_link::link::{CommandGuard, EngineData, MutexCommandGuard};
use tempo_link::{LinkConfig, LinkManager, LocalAuthority, TimeAuthority};

/// Authority call observed by the recording double
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ProposeTempo { bpm: f64, at: f64 },
    ForceBeat { beat: f64, quantum: f64, at: f64 },
    StartAlign { beat: f64, quantum: f64 },
    SetPlaying { playing: bool, at: f64 },
}

/// LocalAuthority that records every mutating call
pub struct RecordingAuthority {
    inner: LocalAuthority,
    calls: Mutex<Vec<Call>>,
}

impl RecordingAuthority {
    pub fn new(bpm: f64) -> Self {
        Self {
            inner: LocalAuthority::new(bpm),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TimeAuthority for RecordingAuthority {
    fn current_tempo(&self) -> f64 {
        self.inner.current_tempo()
    }

    fn beat_at_time(&self, seconds: f64, quantum: f64) -> f64 {
        self.inner.beat_at_time(seconds, quantum)
    }

    fn propose_tempo(&self, bpm: f64, at_seconds: f64) {
        self.record(Call::ProposeTempo { bpm, at: at_seconds });
        self.inner.propose_tempo(bpm, at_seconds);
    }

    fn force_beat_at_time(&self, beat: f64, quantum: f64, at_seconds: f64) {
        self.record(Call::ForceBeat {
            beat,
            quantum,
            at: at_seconds,
        });
        self.inner.force_beat_at_time(beat, quantum, at_seconds);
    }

    fn request_beat_at_start_playing_time(&self, beat: f64, quantum: f64) {
        self.record(Call::StartAlign { beat, quantum });
        self.inner.request_beat_at_start_playing_time(beat, quantum);
    }

    fn set_is_playing(&self, playing: bool, at_seconds: f64) {
        self.record(Call::SetPlaying {
            playing,
            at: at_seconds,
        });
        self.inner.set_is_playing(playing, at_seconds);
    }

    fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    fn set_start_stop_sync_enabled(&self, enabled: bool) {
        self.inner.set_start_stop_sync_enabled(enabled);
    }

    fn is_start_stop_sync_enabled(&self) -> bool {
        self.inner.is_start_stop_sync_enabled()
    }
}

/// Guard whose non-blocking path can be forced to fail
pub struct ToggleGuard {
    inner: MutexCommandGuard,
    busy: Arc<AtomicBool>,
}

impl ToggleGuard {
    pub fn new(busy: Arc<AtomicBool>) -> Self {
        Self {
            inner: MutexCommandGuard::new(EngineData::default()),
            busy,
        }
    }
}

impl CommandGuard for ToggleGuard {
    fn with_lock<R>(&self, f: impl FnOnce(&mut EngineData) -> R) -> R {
        self.inner.with_lock(f)
    }

    fn try_with_lock<R>(&self, f: impl FnOnce(&mut EngineData) -> R) -> Option<R> {
        if self.busy.load(Ordering::SeqCst) {
            None
        } else {
            self.inner.try_with_lock(f)
        }
    }
}

pub struct Harness {
    pub manager: LinkManager<ToggleGuard>,
    pub authority: Arc<RecordingAuthority>,
    pub busy: Arc<AtomicBool>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&LinkConfig::default())
    }

    pub fn with_config(config: &LinkConfig) -> Self {
        let authority = Arc::new(RecordingAuthority::new(config.initial_bpm));
        let busy = Arc::new(AtomicBool::new(false));
        let manager =
            LinkManager::with_guard(authority.clone(), config, ToggleGuard::new(Arc::clone(&busy)))
                .unwrap();
        Self {
            manager,
            authority,
            busy,
        }
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }
}
