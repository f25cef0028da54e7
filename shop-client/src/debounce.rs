// shop-client/src/debounce.rs
// Quiet-period debouncer for search input

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lets only the last value of a burst through.
///
/// Every call to [`settle`](Debouncer::settle) takes a ticket, sleeps for the
/// quiet period and returns the value only if no newer call was made in the
/// meantime. Clones share the same ticket counter.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Wait out the quiet period; `None` if superseded
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.quiet).await;
        (self.generation.load(Ordering::SeqCst) == ticket).then_some(value)
    }

    /// Invalidate every pending `settle`
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
