use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tokio::time::{self, Duration, Instant};

/// Source of "now" and of waiting.
///
/// The consistency verifier sleeps between attempts through this trait,
/// so tests can substitute a clock that never blocks.
pub trait Clock: Send + Sync {
    /// Current instant on this clock
    fn now(&self) -> Instant;

    /// Future that completes once `d` has elapsed on this clock
    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Clock backed by the tokio timer.
///
/// Under `#[tokio::test(start_paused = true)]` the runtime auto-advances
/// while every task is idle, so sleeps on this clock complete instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

/// Virtual clock that only moves when something sleeps on it or calls
/// [`PausedClock::advance`].
///
/// Sleeps return immediately and are recorded, which lets a test assert
/// exactly how long a retry loop would have waited.
#[derive(Debug)]
pub struct PausedClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl PausedClock {
    /// Clock frozen at the current tokio instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, d: Duration) {
        *self.elapsed.lock() += d;
    }

    /// Virtual time elapsed since construction
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for PausedClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.sleeps.lock().push(d);
        self.advance(d);
        Box::pin(std::future::ready(()))
    }
}

impl Default for PausedClock {
    fn default() -> Self {
        Self::new()
    }
}
