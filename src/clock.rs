use std::time::Instant;

/// Monotonic time source, in seconds since an arbitrary per-clock origin.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// Wall-clock-independent clock backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Whole seconds between two readings. Truncates, and clamps backwards movement to 0.
pub fn elapsed_whole_seconds(start_secs: f64, end_secs: f64) -> u64 {
    let elapsed = end_secs - start_secs;
    if elapsed.is_nan() || elapsed <= 0.0 {
        return 0;
    }
    // `as` saturates on overflow.
    elapsed.trunc() as u64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test clock that returns scripted readings in order, then repeats the last one.
    pub(crate) struct ScriptedClock {
        readings: Mutex<Vec<f64>>,
    }

    impl ScriptedClock {
        pub(crate) fn new(readings: &[f64]) -> Self {
            let mut readings = readings.to_vec();
            readings.reverse();
            Self {
                readings: Mutex::new(readings),
            }
        }
    }

    impl Clock for ScriptedClock {
        fn now_secs(&self) -> f64 {
            let mut r = self.readings.lock().unwrap();
            if r.len() > 1 {
                r.pop().unwrap()
            } else {
                r.last().copied().unwrap_or(0.0)
            }
        }
    }

    #[test]
    fn truncates_fractional_seconds() {
        assert_eq!(elapsed_whole_seconds(10.0, 15.999), 5);
        assert_eq!(elapsed_whole_seconds(0.2, 1.1), 0);
        assert_eq!(elapsed_whole_seconds(0.0, 3725.5), 3725);
    }

    #[test]
    fn backwards_clock_records_zero() {
        assert_eq!(elapsed_whole_seconds(100.0, 40.0), 0);
        assert_eq!(elapsed_whole_seconds(1.0, f64::NAN), 0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_secs();
        let b = clock.now_secs();
        assert!(b >= a);
    }

    #[test]
    fn scripted_clock_replays_readings() {
        let clock = ScriptedClock::new(&[5.0, 2.0]);
        assert_eq!(clock.now_secs(), 5.0);
        assert_eq!(clock.now_secs(), 2.0);
        assert_eq!(clock.now_secs(), 2.0);
    }
}
