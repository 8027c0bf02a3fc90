//! Monotonic time source and the session origin
//!
//! Every action timestamp is an offset in seconds from the [`Origin`]
//! captured when the engine starts.

use parking_lot::Mutex as ParkingMutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real monotonic clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for replays and tests
#[derive(Debug)]
pub struct ManualClock {
    now: ParkingMutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: ParkingMutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Zero point of a recording session
#[derive(Debug, Clone, Copy)]
pub struct Origin {
    instant: Instant,
    unix_secs: f64,
}

impl Origin {
    pub fn capture(clock: &dyn Clock) -> Self {
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        Self {
            instant: clock.now(),
            unix_secs,
        }
    }

    /// Seconds elapsed between the origin and `at` (never negative)
    pub fn offset(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.instant).as_secs_f64()
    }

    /// Wall-clock time of the origin, in seconds since the Unix epoch
    pub fn unix_secs(&self) -> f64 {
        self.unix_secs
    }
}
