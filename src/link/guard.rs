// Synchronization guard - Mutual exclusion around the live command buffer
//
// The control thread takes the guard with a blocking acquire; the audio thread
// only ever tries. Critical sections on both sides are a fixed-size struct copy.

use std::sync::{Mutex, PoisonError, TryLockError};

use super::engine_data::EngineData;

/// Guard protecting the live [`EngineData`]
///
/// Implementations must make `try_with_lock` return immediately when the guard is
/// held elsewhere. Test doubles can force either outcome.
pub trait CommandGuard: Send + Sync {
    /// Blocking access (control thread)
    fn with_lock<R>(&self, f: impl FnOnce(&mut EngineData) -> R) -> R;

    /// Non-blocking access (audio thread); `None` when the guard is busy
    fn try_with_lock<R>(&self, f: impl FnOnce(&mut EngineData) -> R) -> Option<R>;
}

/// Default guard backed by `std::sync::Mutex`
///
/// Poisoning is ignored: every writer replaces the whole `EngineData`.
#[derive(Debug, Default)]
pub struct MutexCommandGuard {
    inner: Mutex<EngineData>,
}

impl MutexCommandGuard {
    pub fn new(initial: EngineData) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }
}

impl CommandGuard for MutexCommandGuard {
    fn with_lock<R>(&self, f: impl FnOnce(&mut EngineData) -> R) -> R {
        let mut data = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }

    fn try_with_lock<R>(&self, f: impl FnOnce(&mut EngineData) -> R) -> Option<R> {
        match self.inner.try_lock() {
            Ok(mut data) => Some(f(&mut data)),
            Err(TryLockError::Poisoned(poisoned)) => Some(f(&mut poisoned.into_inner())),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
