use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Generation stamp handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic request counter. Only the holder of the latest ticket may apply
/// its result.
#[derive(Debug, Default)]
pub struct RequestGenerations {
    latest: AtomicU64,
}

impl RequestGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, invalidating every earlier ticket.
    pub fn advance(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

/// Trailing-edge debounce over a shared generation counter.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Waits out the window. Returns `false` if a newer generation started
    /// in the meantime.
    pub async fn quiesce(&self, generations: &RequestGenerations, ticket: Ticket) -> bool {
        if !self.window.is_zero() {
            tokio::time::sleep(self.window).await;
        }
        generations.is_current(ticket)
    }
}
