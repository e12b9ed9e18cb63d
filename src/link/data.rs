// LinkData - State shared between the control thread and the audio thread
//
// The time authority handle lives as long as the session. The live command
// buffer sits behind the guard: the control thread only writes it, the audio
// thread only reads (and clears one-shots) through a non-blocking pull.

use std::sync::Arc;

use super::engine_data::EngineData;
use super::guard::{CommandGuard, MutexCommandGuard};
use crate::authority::TimeAuthority;

pub struct LinkData<G = MutexCommandGuard> {
    authority: Arc<dyn TimeAuthority>,
    commands: G,
}

impl<G: CommandGuard> LinkData<G> {
    pub fn new(authority: Arc<dyn TimeAuthority>, commands: G) -> Self {
        Self {
            authority,
            commands,
        }
    }

    pub fn authority(&self) -> &Arc<dyn TimeAuthority> {
        &self.authority
    }

    pub fn guard(&self) -> &G {
        &self.commands
    }

    /// Apply one control-thread request as a whole-buffer write
    ///
    /// The buffer is copied out, modified, and copied back under one guard
    /// acquisition so the audio thread can never observe half a request.
    pub fn update_commands(&self, request: impl FnOnce(&mut EngineData)) {
        self.commands.with_lock(|live| {
            let mut next = *live;
            request(&mut next);
            *live = next;
        });
    }

    /// Copy of the live buffer (blocking; control thread only)
    pub fn read_commands(&self) -> EngineData {
        self.commands.with_lock(|live| *live)
    }

    /// Non-blocking pull for the audio thread
    ///
    /// Returns the live buffer and clears its one-shots, or `None` if the
    /// control thread currently holds the guard.
    pub fn try_take_commands(&self) -> Option<EngineData> {
        self.commands.try_with_lock(EngineData::take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::LocalAuthority;

    fn shared() -> LinkData {
        LinkData::new(
            Arc::new(LocalAuthority::new(120.0)),
            MutexCommandGuard::new(EngineData::default()),
        )
    }

    #[test]
    fn test_take_clears_live_one_shots() {
        let data = shared();
        data.update_commands(|c| {
            c.propose_bpm = Some(140.0);
            c.request_start = true;
            c.output_latency = 256;
        });

        let pulled = data.try_take_commands().unwrap();
        assert_eq!(pulled.propose_bpm, Some(140.0));
        assert!(pulled.request_start);

        let live = data.read_commands();
        assert_eq!(live.propose_bpm, None);
        assert!(!live.request_start);
        assert_eq!(live.output_latency, 256);
    }

    #[test]
    fn test_authority_is_shared() {
        let data = shared();
        assert_eq!(data.authority().current_tempo(), 120.0);
    }
}
