//! Cooperative cancellation token shared across a pipeline's segmenter and
//! worker tasks.
//!
//! One bit, checked at well-defined points (before processing the next input
//! fragment, before dispatching a segment to a worker) — the same idiom this
//! codebase already uses for cancellation elsewhere: an `Arc<AtomicU64>`
//! epoch counter for whole-engine stop/restart, and `Arc<AtomicBool>` tokens
//! for per-session cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug, Default)]
pub struct StreamToken(Arc<AtomicBool>);

impl StreamToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Sets the cancellation bit. Idempotent — cancelling an already
    /// cancelled token is a no-op.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
