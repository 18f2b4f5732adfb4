//! Upstream call pacing
//!
//! Single-token pacing primitive that guarantees a minimum gap between
//! successive upstream calls, replacing ad hoc sleeps scattered through
//! fetch loops. Callers `pause().await` before each call; the first call
//! proceeds immediately and later calls wait out the remainder of the
//! gap. Holding the internal lock while sleeping serializes concurrent
//! callers, so the gap holds across tasks as well.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct Pacer {
    min_gap: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// No-op pacer for tests and replay runs.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the minimum gap since the previous call has elapsed.
    pub async fn pause(&self) {
        if self.min_gap.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let elapsed = now.duration_since(previous);
            if elapsed < self.min_gap {
                tokio::time::sleep(self.min_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
