use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation latch shared between a resample call and its
/// caller.
///
/// The latch is one-way: once [`cancel`](CancelToken::cancel) is observed it
/// stays set for every clone. Workers poll [`is_cancelled`] at coarse
/// intervals rather than being interrupted, so cancellation takes effect
/// within roughly one tile of work.
///
/// [`is_cancelled`]: CancelToken::is_cancelled
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    aborted: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}
