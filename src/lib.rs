// Tempo Link - Library exports for the demo binary, tests and benchmarks

pub mod authority;
pub mod config;
pub mod error;
pub mod link;
pub mod messaging;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use authority::{LocalAuthority, TimeAuthority};
pub use config::LinkConfig;
pub use error::{LinkError, LinkResult};
pub use link::{
    AudioLink, ClockMapping, CommandGuard, EngineData, LinkManager, ListenerId, ListenerKind,
    MutexCommandGuard, RenderTiming, StopEngineError,
};
pub use messaging::event::TransportEvent;
pub use sequencer::{Click, ClickType, Tempo};
