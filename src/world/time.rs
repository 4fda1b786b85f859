use std::time::{Duration, Instant};

/// Monotonic frame clock in milliseconds. Everything timed in the client reads
/// `now()` from here instead of the wall clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: Instant,
    now_ms: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            now_ms: 0,
        }
    }

    /// Clock that only moves through `advance`, starting at `start_ms`.
    pub fn manual(start_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            now_ms: start_ms,
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn advance(&mut self, millis: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(millis);
        self.now_ms
    }

    pub fn advance_duration(&mut self, duration: Duration) -> u64 {
        let millis = duration.as_millis().min(u128::from(u64::MAX)) as u64;
        self.advance(millis)
    }

    /// Catches up with real time; never moves backwards.
    pub fn update(&mut self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin);
        let elapsed_ms = elapsed.as_millis().min(u128::from(u64::MAX)) as u64;
        self.now_ms = self.now_ms.max(elapsed_ms);
        self.now_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timer {
    started_at: u64,
}

impl Timer {
    pub fn started_at(now: u64) -> Self {
        Self { started_at: now }
    }

    pub fn restart(&mut self, now: u64) {
        self.started_at = now;
    }

    pub fn start_ticks(&self) -> u64 {
        self.started_at
    }

    pub fn ticks_elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let mut clock = FrameClock::manual(1_000);
        assert_eq!(clock.now(), 1_000);
        assert_eq!(clock.advance(250), 1_250);
        assert_eq!(clock.advance_duration(Duration::from_millis(50)), 1_300);
    }

    #[test]
    fn update_is_monotonic() {
        let mut clock = FrameClock::manual(10_000);
        let now = Instant::now();
        assert_eq!(clock.update(now), 10_000);
    }

    #[test]
    fn timer_measures_elapsed() {
        let mut timer = Timer::started_at(100);
        assert_eq!(timer.ticks_elapsed(350), 250);
        assert_eq!(timer.ticks_elapsed(50), 0);
        timer.restart(400);
        assert_eq!(timer.start_ticks(), 400);
        assert_eq!(timer.ticks_elapsed(450), 50);
    }
}
