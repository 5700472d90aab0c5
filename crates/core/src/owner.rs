//! Owner-thread bookkeeping for the current context.

use std::thread::{self, ThreadId};

/// Identity of the thread that made the context current.
///
/// This is a capability check, not a lock: guarded operations compare the
/// calling thread against the recorded owner and fail closed on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOwner(ThreadId);

impl ThreadOwner {
    /// Records the calling thread as owner.
    pub fn claim() -> Self {
        Self(thread::current().id())
    }

    /// Returns whether the calling thread is the owner.
    pub fn is_current(&self) -> bool {
        self.0 == thread::current().id()
    }
}
