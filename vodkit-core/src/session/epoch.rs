use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter bumped on every session transition.
///
/// Deferred work captures the value when scheduled and drops its writes if
/// the session changed in between.
#[derive(Debug, Clone, Default)]
pub struct SessionEpoch(Arc<AtomicU64>);

impl SessionEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Start a new session epoch and return it.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }
}
