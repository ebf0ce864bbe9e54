//! Cooperative cancellation, honored between tags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between the signal handler and the driver loop.
///
/// Clone is cheap and shares state. The loop polls between tags, so an
/// interrupt never tears a tag's checkpoint commit; the in-progress tag's
/// partial results are simply discarded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Trip the token on the first Ctrl-C.
pub async fn watch_for_interrupt(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("interrupt received; finishing the current tag, then stopping");
        token.cancel();
    }
}
