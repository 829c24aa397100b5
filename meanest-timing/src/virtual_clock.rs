use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::timer::Timer;

/// Deterministic clock: `sleep` returns immediately and advances `now`.
///
/// Clones share the same clock, so a test can keep one handle and inspect
/// the sleeps issued through another.
#[derive(Debug, Clone, Default)]
pub struct VirtualTimer {
    now_ns: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Every sleep issued so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        match self.sleeps.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Timer for VirtualTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        match self.sleeps.lock() {
            Ok(mut log) => log.push(d),
            Err(poisoned) => poisoned.into_inner().push(d),
        }
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let timer = VirtualTimer::new();
        let handle = timer.clone();
        timer.sleep(Duration::from_millis(50));
        timer.sleep(Duration::from_millis(300));
        assert_eq!(handle.now(), 350_000_000);
        assert_eq!(handle.total_slept(), Duration::from_millis(350));
        assert_eq!(handle.elapsed(50_000_000), Duration::from_millis(300));
    }
}
