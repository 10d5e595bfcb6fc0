use chrono::{DateTime, Duration, DurationRound, Utc};
use std::sync::Mutex;

/// Source of run-start timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to microseconds, strictly increasing across calls.
///
/// Stored timestamps use microsecond precision, so truncating here keeps the value a run
/// reports equal to the value read back from storage.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock whose first reading is strictly after `floor`, e.g. the newest timestamp
    /// already stored by an earlier process.
    pub fn after(floor: Option<DateTime<Utc>>) -> Self {
        Self {
            last: Mutex::new(floor),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let wall = wall.duration_trunc(Duration::microseconds(1)).unwrap_or(wall);
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = match *last {
            Some(prev) if wall <= prev => prev + Duration::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

/// Deterministic clock for tests: starts at a fixed instant and advances one second per call.
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            next: Mutex::new(start),
            step: Duration::seconds(1),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = match self.next.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let out = *next;
        *next = out + self.step;
        out
    }
}
