// Link module - Control thread <-> audio thread transport synchronization
//
// The control thread writes requests into a guarded command buffer through
// LinkManager; the audio thread pulls them without blocking through AudioLink
// and applies them to the time authority.

pub mod clock;
pub mod data;
pub mod engine_data;
pub mod guard;
pub mod listener;
pub mod manager;
pub mod renderer;

pub use clock::{ClockMapping, host_time_now};
pub use data::LinkData;
pub use engine_data::{DEFAULT_QUANTUM, EngineData, TransportRequest};
pub use guard::{CommandGuard, MutexCommandGuard};
pub use listener::{ListenerId, ListenerKind};
pub use manager::{LinkManager, StopEngineError};
pub use renderer::{AudioLink, CycleCommands, RenderTiming};
