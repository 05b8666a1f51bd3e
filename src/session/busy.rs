use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "an operation is in flight" flag.
///
/// Clones observe the same flag, so an interface can read it to disable controls.
#[derive(Clone, Debug, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

/// Holds the flag; releases it on drop, whether the operation succeeded, failed or was cancelled.
#[derive(Debug)]
#[must_use = "the flag is released as soon as the guard is dropped"]
pub struct BusyGuard(Arc<AtomicBool>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Take the flag, or `None` if it is already held.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
