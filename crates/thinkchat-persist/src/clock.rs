use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond clock whose readings strictly increase
///
/// Every timestamp a store hands out comes from one of these, so
/// `created_at` totally orders messages even when appends land within the
/// same millisecond, and values survive backends that keep only
/// milliseconds (BSON dates, SQLite integer columns).
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_ms: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock whose first reading is later than `last_ms`, for stores
    /// reopened over existing data.
    pub fn starting_after(last_ms: i64) -> Self {
        Self {
            last_ms: AtomicI64::new(last_ms),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let wall_ms = Utc::now().timestamp_millis();
        let mut prev = self.last_ms.load(Ordering::Acquire);
        loop {
            let next = wall_ms.max(prev + 1);
            match self
                .last_ms
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return DateTime::from_timestamp_millis(next).unwrap_or_default(),
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_readings_strictly_increase() {
        let clock = MonotonicClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_millisecond_precision() {
        let clock = MonotonicClock::new();
        let now = clock.now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_starting_after_future_value() {
        let future_ms = Utc::now().timestamp_millis() + 60_000;
        let clock = MonotonicClock::starting_after(future_ms);
        assert_eq!(clock.now().timestamp_millis(), future_ms + 1);
    }

    #[test]
    fn test_unique_across_threads() {
        let clock = Arc::new(MonotonicClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..250).map(|_| clock.now()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
