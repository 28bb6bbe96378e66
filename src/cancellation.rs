//! Cooperative cancellation for in-flight operations.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared flag observed by the executor and the transport.
///
/// Clones observe the same flag. Cancelling after a reply has been received
/// has no effect on that reply.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        Default::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
