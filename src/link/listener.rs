// Listeners - Control-thread subscriptions to session changes
// Callbacks only ever run on the control thread, from LinkManager::poll_events

use uuid::Uuid;

pub type TempoCallback = Box<dyn FnMut(f64, f64) + Send>;
pub type FlagCallback = Box<dyn FnMut(bool) + Send>;

/// What a listener subscribes to
pub enum ListenerKind {
    /// `(bpm, quantum)` whenever the session tempo changes
    Tempo(TempoCallback),
    /// Authority enabled/disabled
    Activation(FlagCallback),
    /// Peers connected/disconnected
    Connection(FlagCallback),
    /// Transport started/stopped
    Playing(FlagCallback),
}

impl ListenerKind {
    pub fn tempo(callback: impl FnMut(f64, f64) + Send + 'static) -> Self {
        ListenerKind::Tempo(Box::new(callback))
    }

    pub fn activation(callback: impl FnMut(bool) + Send + 'static) -> Self {
        ListenerKind::Activation(Box::new(callback))
    }

    pub fn connection(callback: impl FnMut(bool) + Send + 'static) -> Self {
        ListenerKind::Connection(Box::new(callback))
    }

    pub fn playing(callback: impl FnMut(bool) + Send + 'static) -> Self {
        ListenerKind::Playing(Box::new(callback))
    }
}

/// Handle returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

struct Listener {
    id: ListenerId,
    kind: ListenerKind,
}

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        self.listeners.push(Listener { id, kind });
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|l| l.id == id) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify_tempo(&mut self, bpm: f64, quantum: f64) {
        for listener in &mut self.listeners {
            if let ListenerKind::Tempo(callback) = &mut listener.kind {
                callback(bpm, quantum);
            }
        }
    }

    pub fn notify_activation(&mut self, enabled: bool) {
        for listener in &mut self.listeners {
            if let ListenerKind::Activation(callback) = &mut listener.kind {
                callback(enabled);
            }
        }
    }

    pub fn notify_connection(&mut self, connected: bool) {
        for listener in &mut self.listeners {
            if let ListenerKind::Connection(callback) = &mut listener.kind {
                callback(connected);
            }
        }
    }

    pub fn notify_playing(&mut self, playing: bool) {
        for listener in &mut self.listeners {
            if let ListenerKind::Playing(callback) = &mut listener.kind {
                callback(playing);
            }
        }
    }
}
