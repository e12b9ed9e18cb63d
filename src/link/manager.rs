// LinkManager - Control-thread side of the link session
//
// Owns the session: shared state, clock mapping, engine state machine, the
// receiving end of the audio event channel and the listener registry.
// Every request is one guarded whole-buffer write; nothing here runs on the
// audio thread.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use ringbuf::traits::Consumer;
use thiserror::Error;

use super::clock::{ClockMapping, host_time_now};
use super::data::LinkData;
use super::engine_data::EngineData;
use super::guard::{CommandGuard, MutexCommandGuard};
use super::listener::{ListenerId, ListenerKind, ListenerRegistry};
use super::renderer::AudioLink;
use crate::authority::{LocalAuthority, TimeAuthority};
use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult, validate_beat_time, validate_bpm, validate_quantum};
use crate::messaging::channels::{EventConsumer, EventProducer, create_event_channel};
use crate::messaging::event::TransportEvent;

/// Audio engine state
///
/// Clock parameters may only change while `Stopped`. The stopped state keeps
/// the event producer that the next [`AudioLink`] will own.
enum EngineState {
    Stopped { events: EventProducer },
    Running,
}

/// Failed [`LinkManager::stop_engine`]; still owns the rejected handle
#[derive(Error)]
#[error("{error}")]
pub struct StopEngineError<G = MutexCommandGuard> {
    #[source]
    error: LinkError,
    audio: AudioLink<G>,
}

impl<G> StopEngineError<G> {
    fn new(error: LinkError, audio: AudioLink<G>) -> Self {
        Self { error, audio }
    }

    pub fn error(&self) -> &LinkError {
        &self.error
    }

    /// Recover the handle, e.g. to stop the session it belongs to
    pub fn into_audio_link(self) -> AudioLink<G> {
        self.audio
    }
}

impl<G> fmt::Debug for StopEngineError<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopEngineError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<G> From<StopEngineError<G>> for LinkError {
    fn from(err: StopEngineError<G>) -> Self {
        err.error
    }
}

pub struct LinkManager<G = MutexCommandGuard> {
    shared: Arc<LinkData<G>>,
    clock: ClockMapping,
    state: EngineState,
    events: EventConsumer,
    listeners: ListenerRegistry,
    last_enabled: bool,
    last_connected: bool,
}

impl LinkManager<MutexCommandGuard> {
    /// Session backed by a standalone [`LocalAuthority`] at `config.initial_bpm`
    pub fn from_config(config: &LinkConfig) -> LinkResult<Self> {
        let authority = Arc::new(LocalAuthority::new(config.initial_bpm));
        Self::new(authority, config)
    }

    pub fn new(authority: Arc<dyn TimeAuthority>, config: &LinkConfig) -> LinkResult<Self> {
        Self::with_guard(
            authority,
            config,
            MutexCommandGuard::new(EngineData::default()),
        )
    }
}

impl<G: CommandGuard> LinkManager<G> {
    /// Session with an injected guard (tests swap in controllable guards here)
    pub fn with_guard(
        authority: Arc<dyn TimeAuthority>,
        config: &LinkConfig,
        guard: G,
    ) -> LinkResult<Self> {
        config.validate()?;
        let clock = config.clock()?;

        let initial = EngineData::new(
            clock.seconds_to_host_units(config.output_latency_seconds),
            config.quantum,
        );
        guard.with_lock(|live| *live = initial);

        authority.set_start_stop_sync_enabled(config.start_stop_sync);
        let last_enabled = authority.is_enabled();
        let last_connected = authority.is_connected();

        let (producer, consumer) = create_event_channel(config.event_capacity);

        info!(
            "Link session ready: {:.2} BPM, quantum {}, {} Hz",
            authority.current_tempo(),
            config.quantum,
            clock.sample_rate()
        );

        Ok(Self {
            shared: Arc::new(LinkData::new(authority, guard)),
            clock,
            state: EngineState::Stopped { events: producer },
            events: consumer,
            listeners: ListenerRegistry::new(),
            last_enabled,
            last_connected,
        })
    }

    // ─────────────────────────────────────────────────────────────
    // Engine lifecycle
    // ─────────────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running)
    }

    /// Hand out the audio-thread handle; the clock is frozen until it comes back
    pub fn start_engine(&mut self) -> LinkResult<AudioLink<G>> {
        match std::mem::replace(&mut self.state, EngineState::Running) {
            EngineState::Stopped { events } => {
                info!("Audio engine started");
                Ok(AudioLink::new(Arc::clone(&self.shared), self.clock, events))
            }
            EngineState::Running => Err(LinkError::EngineRunning),
        }
    }

    /// Take the audio-thread handle back once the audio callback has stopped
    ///
    /// A rejected handle comes back inside the error so its own session can
    /// still be stopped.
    pub fn stop_engine(&mut self, audio: AudioLink<G>) -> Result<(), StopEngineError<G>> {
        if !Arc::ptr_eq(audio.shared(), &self.shared) {
            return Err(StopEngineError::new(LinkError::ForeignAudioLink, audio));
        }
        if !self.is_running() {
            return Err(StopEngineError::new(LinkError::EngineStopped, audio));
        }
        self.state = EngineState::Stopped {
            events: audio.into_events(),
        };
        info!("Audio engine stopped");
        Ok(())
    }

    pub fn clock(&self) -> &ClockMapping {
        &self.clock
    }

    /// Replace the clock mapping; only allowed while the engine is stopped
    pub fn set_clock(&mut self, clock: ClockMapping) -> LinkResult<()> {
        if self.is_running() {
            warn!("Refusing clock change while the audio engine is running");
            return Err(LinkError::EngineRunning);
        }
        self.clock = clock;
        debug!(
            "Clock mapping set: {} Hz, {} host units/s",
            clock.sample_rate(),
            clock.seconds_to_host_time()
        );
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) -> LinkResult<()> {
        let clock = ClockMapping::new(sample_rate, self.clock.seconds_to_host_time())?;
        self.set_clock(clock)
    }

    // ─────────────────────────────────────────────────────────────
    // Requests (whole-buffer writes)
    // ─────────────────────────────────────────────────────────────

    pub fn request_start(&self) {
        debug!("Start requested");
        self.shared.update_commands(|c| c.request_start = true);
    }

    pub fn request_stop(&self) {
        debug!("Stop requested");
        self.shared.update_commands(|c| c.request_stop = true);
    }

    /// Start or stop, like a play button
    pub fn set_playing(&self, playing: bool) {
        if playing {
            self.request_start();
        } else {
            self.request_stop();
        }
    }

    pub fn propose_tempo(&self, bpm: f64) -> LinkResult<()> {
        let bpm = validate_bpm(bpm)?;
        debug!("Tempo proposal: {} BPM", bpm);
        self.shared.update_commands(|c| c.propose_bpm = Some(bpm));
        Ok(())
    }

    pub fn reset_beat_time(&self, beat_time: f64, quantum: f64) -> LinkResult<()> {
        let beat_time = validate_beat_time(beat_time)?;
        let quantum = validate_quantum(quantum)?;
        self.shared.update_commands(|c| {
            c.reset_to_beat_time = Some(beat_time);
            c.quantum = quantum;
        });
        Ok(())
    }

    pub fn set_quantum(&self, quantum: f64) -> LinkResult<()> {
        let quantum = validate_quantum(quantum)?;
        self.shared.update_commands(|c| c.quantum = quantum);
        Ok(())
    }

    /// Hardware output latency in host time units
    pub fn set_output_latency(&self, host_time_units: u64) {
        self.shared
            .update_commands(|c| c.output_latency = host_time_units);
    }

    /// Audio route changed: re-read the hardware latency (in seconds)
    pub fn handle_route_change(&self, output_latency_seconds: f64) -> LinkResult<()> {
        if !(output_latency_seconds.is_finite() && output_latency_seconds >= 0.0) {
            return Err(LinkError::InvalidConfig(format!(
                "output latency must be >= 0 seconds, got {}",
                output_latency_seconds
            )));
        }
        let latency = self.clock.seconds_to_host_units(output_latency_seconds);
        self.set_output_latency(latency);
        info!(
            "Audio route change: output latency {:.2} ms",
            output_latency_seconds * 1000.0
        );
        Ok(())
    }

    /// Copy of the live command buffer (requests not yet pulled)
    pub fn pending_commands(&self) -> EngineData {
        self.shared.read_commands()
    }

    // ─────────────────────────────────────────────────────────────
    // Session status (read straight from the authority)
    // ─────────────────────────────────────────────────────────────

    pub fn authority(&self) -> &Arc<dyn TimeAuthority> {
        self.shared.authority()
    }

    /// Shared session state, for issuing requests from other non-audio threads
    pub fn shared_data(&self) -> &Arc<LinkData<G>> {
        &self.shared
    }

    pub fn tempo(&self) -> f64 {
        self.authority().current_tempo()
    }

    pub fn is_playing(&self) -> bool {
        self.authority().is_playing()
    }

    pub fn quantum(&self) -> f64 {
        self.pending_commands().quantum
    }

    pub fn beat_time_at(&self, host_time: u64) -> f64 {
        self.authority()
            .beat_at_time(self.clock.to_authority_time(host_time), self.quantum())
    }

    /// Current beat on the built-in host clock
    pub fn beat_time(&self) -> f64 {
        self.beat_time_at(host_time_now())
    }

    pub fn is_enabled(&self) -> bool {
        self.authority().is_enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.authority().set_enabled(enabled);
    }

    pub fn is_connected(&self) -> bool {
        self.authority().is_connected()
    }

    pub fn set_start_stop_sync_enabled(&self, enabled: bool) {
        self.authority().set_start_stop_sync_enabled(enabled);
    }

    pub fn is_start_stop_sync_enabled(&self) -> bool {
        self.authority().is_start_stop_sync_enabled()
    }

    // ─────────────────────────────────────────────────────────────
    // Listeners
    // ─────────────────────────────────────────────────────────────

    pub fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = self.listeners.add(kind);
        debug!("Listener added ({} registered)", self.listeners.len());
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Drain audio-thread events and poll authority flags, notifying listeners
    ///
    /// Returns the number of audio-thread events processed.
    pub fn poll_events(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.events.try_pop() {
            processed += 1;
            match event {
                TransportEvent::TempoChanged { bpm, quantum } => {
                    debug!("Session tempo changed: {:.2} BPM", bpm);
                    self.listeners.notify_tempo(bpm, quantum);
                }
                TransportEvent::PlayingChanged { playing, .. } => {
                    debug!("Transport {}", if playing { "started" } else { "stopped" });
                    self.listeners.notify_playing(playing);
                }
            }
        }

        let enabled = self.is_enabled();
        if enabled != self.last_enabled {
            self.last_enabled = enabled;
            info!("Link is {}", if enabled { "enabled" } else { "disabled" });
            self.listeners.notify_activation(enabled);
        }

        let connected = self.is_connected();
        if connected != self.last_connected {
            self.last_connected = connected;
            info!("Link connection status: connected = {}", connected);
            self.listeners.notify_connection(connected);
        }

        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn manager() -> LinkManager {
        LinkManager::from_config(&LinkConfig::default()).unwrap()
    }

    #[test]
    fn test_requests_land_in_live_buffer() {
        let manager = manager();
        manager.request_start();
        manager.propose_tempo(128.0).unwrap();
        manager.reset_beat_time(2.0, 3.0).unwrap();
        manager.set_output_latency(480);

        let pending = manager.pending_commands();
        assert!(pending.request_start);
        assert_eq!(pending.propose_bpm, Some(128.0));
        assert_eq!(pending.reset_to_beat_time, Some(2.0));
        assert_eq!(pending.quantum, 3.0);
        assert_eq!(pending.output_latency, 480);
    }

    #[test]
    fn test_invalid_requests_rejected() {
        let manager = manager();
        assert!(matches!(manager.propose_tempo(0.0), Err(LinkError::InvalidTempo(_))));
        assert!(matches!(
            manager.reset_beat_time(f64::NAN, 4.0),
            Err(LinkError::InvalidBeatTime(_))
        ));
        assert!(matches!(manager.set_quantum(0.0), Err(LinkError::InvalidQuantum(_))));
        assert!(!manager.pending_commands().has_one_shots());
    }

    #[test]
    fn test_clock_locked_while_running() {
        let mut manager = manager();
        assert!(manager.set_sample_rate(44100.0).is_ok());

        let audio = manager.start_engine().unwrap();
        assert!(manager.is_running());
        assert_eq!(audio.clock().sample_rate(), 44100.0);
        assert!(matches!(
            manager.set_sample_rate(96000.0),
            Err(LinkError::EngineRunning)
        ));
        assert!(matches!(manager.start_engine(), Err(LinkError::EngineRunning)));

        manager.stop_engine(audio).unwrap();
        assert!(!manager.is_running());
        assert!(manager.set_sample_rate(96000.0).is_ok());
        assert_eq!(manager.clock().sample_rate(), 96000.0);
    }

    #[test]
    fn test_foreign_audio_link_rejected() {
        let mut first = manager();
        let mut second = manager();
        let audio = second.start_engine().unwrap();

        let err = first.stop_engine(audio).unwrap_err();
        assert!(matches!(err.error(), LinkError::ForeignAudioLink));
        assert!(!first.is_running());
        assert!(second.is_running());

        // The owner still gets its handle back and can restart
        second.stop_engine(err.into_audio_link()).unwrap();
        assert!(!second.is_running());
        assert!(second.set_sample_rate(44100.0).is_ok());
        assert!(second.start_engine().is_ok());
    }

    #[test]
    fn test_stop_engine_error_converts_to_link_error() {
        let mut first = manager();
        let mut second = manager();
        let audio = second.start_engine().unwrap();

        let err: LinkError = first.stop_engine(audio).unwrap_err().into();
        assert!(matches!(err, LinkError::ForeignAudioLink));
        assert_eq!(
            err.to_string(),
            "Audio link handle belongs to a different session"
        );
    }

    #[test]
    fn test_route_change_converts_seconds() {
        let manager = manager();
        manager.handle_route_change(0.005).unwrap();
        assert_eq!(manager.pending_commands().output_latency, 5_000_000);
        assert!(manager.handle_route_change(-1.0).is_err());
    }

    #[test]
    fn test_config_applied_at_setup() {
        let config = LinkConfig {
            initial_bpm: 105.0,
            quantum: 3.0,
            output_latency_seconds: 0.002,
            start_stop_sync: true,
            ..LinkConfig::default()
        };
        let manager = LinkManager::from_config(&config).unwrap();

        assert_eq!(manager.tempo(), 105.0);
        assert_eq!(manager.quantum(), 3.0);
        assert!(manager.is_start_stop_sync_enabled());
        assert_eq!(manager.pending_commands().output_latency, 2_000_000);
    }

    #[test]
    fn test_activation_listener_polls_authority() {
        let mut manager = manager();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            manager.add_listener(ListenerKind::activation(move |enabled| {
                seen.lock().unwrap().push(enabled);
            }));
        }

        assert_eq!(manager.poll_events(), 0);
        manager.set_enabled(false);
        manager.poll_events();
        manager.poll_events();

        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_tempo_and_playing_listeners() {
        let mut manager = manager();
        let tempos = Arc::new(Mutex::new(Vec::new()));
        let playing = Arc::new(Mutex::new(Vec::new()));
        {
            let tempos = Arc::clone(&tempos);
            manager.add_listener(ListenerKind::tempo(move |bpm, quantum| {
                tempos.lock().unwrap().push((bpm, quantum));
            }));
            let playing = Arc::clone(&playing);
            manager.add_listener(ListenerKind::playing(move |p| {
                playing.lock().unwrap().push(p);
            }));
        }

        let mut audio = manager.start_engine().unwrap();
        manager.propose_tempo(90.0).unwrap();
        manager.request_start();
        audio.render(1_000_000, 256);

        assert_eq!(manager.poll_events(), 2);
        assert_eq!(*tempos.lock().unwrap(), vec![(90.0, 4.0)]);
        assert_eq!(*playing.lock().unwrap(), vec![true]);

        // Events produced before stop are still delivered after the handle returns
        manager.request_stop();
        audio.render(2_000_000, 256);
        manager.stop_engine(audio).unwrap();
        assert_eq!(manager.poll_events(), 1);
        assert_eq!(*playing.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_latest_tempo_delivered_after_full_ring() {
        let config = LinkConfig {
            event_capacity: 1,
            ..LinkConfig::default()
        };
        let mut manager = LinkManager::from_config(&config).unwrap();
        let tempos = Arc::new(Mutex::new(Vec::new()));
        {
            let tempos = Arc::clone(&tempos);
            manager.add_listener(ListenerKind::tempo(move |bpm, _| {
                tempos.lock().unwrap().push(bpm);
            }));
        }

        let mut audio = manager.start_engine().unwrap();
        manager.propose_tempo(90.0).unwrap();
        audio.render(1_000_000, 64);
        // Ring is full: this change cannot be published yet
        manager.propose_tempo(100.0).unwrap();
        audio.render(2_000_000, 64);

        assert_eq!(manager.poll_events(), 1);
        assert_eq!(*tempos.lock().unwrap(), vec![90.0]);

        // Nothing new requested; the pending change is retried
        audio.render(3_000_000, 64);
        assert_eq!(manager.poll_events(), 1);
        assert_eq!(*tempos.lock().unwrap(), vec![90.0, 100.0]);

        audio.render(4_000_000, 64);
        assert_eq!(manager.poll_events(), 0);
    }

    #[test]
    fn test_requests_survive_engine_restart() {
        let mut manager = manager();
        manager.request_start();

        let mut audio = manager.start_engine().unwrap();
        let timing = audio.render(0, 128);
        assert!(timing.is_playing);
        manager.stop_engine(audio).unwrap();

        // Issued while stopped: consumed by the next engine run
        manager.propose_tempo(100.0).unwrap();
        let mut audio = manager.start_engine().unwrap();
        let timing = audio.render(1_000_000_000, 128);
        assert_eq!(timing.tempo, 100.0);
        assert!(timing.is_playing);
    }
}
