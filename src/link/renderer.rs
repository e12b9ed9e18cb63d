// AudioLink - Audio-thread side of the link session
//
// Called once per audio buffer. Never blocks, never allocates, never logs:
// the command buffer is only reached through a try-lock, and when that fails
// the cycle runs on the previous shadow copy.

use std::sync::Arc;

use ringbuf::traits::Producer;

use super::clock::ClockMapping;
use super::data::LinkData;
use super::engine_data::{EngineData, TransportRequest};
use super::guard::{CommandGuard, MutexCommandGuard};
use crate::messaging::channels::EventProducer;
use crate::messaging::event::TransportEvent;
use crate::sequencer::metronome::{Click, MetronomeScheduler};

/// Commands to apply in one render cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleCommands {
    pub commands: EngineData,
    /// True when this cycle acquired the guard and pulled fresh data
    pub fresh: bool,
}

/// Tempo/phase snapshot handed to sample generation for one buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTiming {
    /// Host time the first frame will be heard (buffer time + output latency)
    pub host_time: u64,
    pub tempo: f64,
    pub beat: f64,
    pub phase: f64,
    pub quantum: f64,
    pub is_playing: bool,
    /// First beat boundary inside this buffer, while playing
    pub click: Option<Click>,
    pub fresh_commands: bool,
}

/// Audio-thread handle; obtain from [`LinkManager::start_engine`](super::LinkManager::start_engine)
pub struct AudioLink<G = MutexCommandGuard> {
    shared: Arc<LinkData<G>>,
    clock: ClockMapping,
    // Audio-thread owned: shadow of the last successful pull
    shadow: EngineData,
    is_playing: bool,
    time_at_last_click: u64,
    last_tempo: f64,
    scheduler: MetronomeScheduler,
    events: EventProducer,
    missed_pulls: u64,
}

impl<G: CommandGuard> AudioLink<G> {
    /// Built on the control thread while the engine is stopped
    pub(crate) fn new(shared: Arc<LinkData<G>>, clock: ClockMapping, events: EventProducer) -> Self {
        let shadow = shared.read_commands().persistent();
        let authority = shared.authority();
        let is_playing = authority.is_playing();
        let last_tempo = authority.current_tempo();

        Self {
            shared,
            clock,
            shadow,
            is_playing,
            time_at_last_click: 0,
            last_tempo,
            scheduler: MetronomeScheduler::new(),
            events,
            missed_pulls: 0,
        }
    }

    /// Non-blocking pull of the control thread's requests
    ///
    /// On success the shadow becomes the pulled buffer and the live one-shots
    /// are cleared. When the guard is busy the shadow is left untouched and
    /// only its persistent fields are used, so a one-shot is never applied twice.
    pub fn pull(&mut self) -> CycleCommands {
        match self.shared.try_take_commands() {
            Some(snapshot) => {
                self.shadow = snapshot;
                CycleCommands {
                    commands: snapshot,
                    fresh: true,
                }
            }
            None => {
                self.missed_pulls += 1;
                CycleCommands {
                    commands: self.shadow.persistent(),
                    fresh: false,
                }
            }
        }
    }

    /// Run one render cycle for a buffer of `frames` frames timestamped `host_time`
    pub fn render(&mut self, host_time: u64, frames: usize) -> RenderTiming {
        let CycleCommands { commands, fresh } = self.pull();

        // Latency is unbounded on the control side; saturate rather than wrap
        let buffer_host_time = host_time.saturating_add(commands.output_latency);
        let at = self.clock.to_authority_time(buffer_host_time);
        let quantum = commands.quantum;

        // Phase before tempo
        let reset = commands.reset_to_beat_time;
        if let Some(beat) = reset {
            self.shared.authority().force_beat_at_time(beat, quantum, at);
            self.scheduler.reset();
        }
        if let Some(bpm) = commands.propose_bpm {
            self.shared.authority().propose_tempo(bpm, at);
        }
        match commands.transport_request() {
            Some(TransportRequest::Stop) => self.shared.authority().set_is_playing(false, at),
            Some(TransportRequest::Start) => self.shared.authority().set_is_playing(true, at),
            None => {}
        }

        self.update_playing(buffer_host_time, quantum, reset.is_some());
        self.update_tempo(quantum);

        let authority = self.shared.authority();
        let tempo = authority.current_tempo();
        let beat = authority.beat_at_time(at, quantum);
        let phase = authority.phase_at_time(at, quantum);

        let click = if self.is_playing {
            let end_host_time = self.clock.host_time_at_frame(buffer_host_time, frames);
            let end_beat = authority.beat_at_time(self.clock.to_authority_time(end_host_time), quantum);
            let click = self.scheduler.check_for_click(beat, end_beat, frames, quantum);
            if let Some(click) = click {
                self.time_at_last_click = self
                    .clock
                    .host_time_at_frame(buffer_host_time, click.frame_offset);
            }
            click
        } else {
            None
        };

        RenderTiming {
            host_time: buffer_host_time,
            tempo,
            beat,
            phase,
            quantum,
            is_playing: self.is_playing,
            click,
            fresh_commands: fresh,
        }
    }

    /// A reset pulled in the same cycle as a start keeps its beat: the
    /// start-at-quantum alignment is skipped for that cycle.
    fn update_playing(&mut self, buffer_host_time: u64, quantum: f64, reset_applied: bool) {
        let playing = self.shared.authority().is_playing();
        if playing == self.is_playing {
            return;
        }

        if playing {
            if !reset_applied {
                // Downbeat lands where the transport started
                self.shared
                    .authority()
                    .request_beat_at_start_playing_time(0.0, quantum);
            }
            self.scheduler.reset();
        }
        self.is_playing = playing;
        self.publish(TransportEvent::PlayingChanged {
            playing,
            host_time: buffer_host_time,
        });
    }

    fn update_tempo(&mut self, quantum: f64) {
        let bpm = self.shared.authority().current_tempo();
        // Retried next cycle when the ring is full, so the latest tempo always lands
        if bpm != self.last_tempo && self.publish(TransportEvent::TempoChanged { bpm, quantum }) {
            self.last_tempo = bpm;
        }
    }

    // False when the control thread fell behind and the ring is full
    fn publish(&mut self, event: TransportEvent) -> bool {
        self.events.try_push(event).is_ok()
    }

    /// Last successfully pulled command buffer
    pub fn shadow(&self) -> &EngineData {
        &self.shadow
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn time_at_last_click(&self) -> u64 {
        self.time_at_last_click
    }

    /// Cycles that found the guard busy
    pub fn missed_pulls(&self) -> u64 {
        self.missed_pulls
    }

    pub fn clock(&self) -> &ClockMapping {
        &self.clock
    }

    pub(crate) fn shared(&self) -> &Arc<LinkData<G>> {
        &self.shared
    }

    pub(crate) fn into_events(self) -> EventProducer {
        self.events
    }
}
