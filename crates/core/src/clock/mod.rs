use std::time::{Duration, Instant};

/// Fixed-rate pacing for the consumer tick.
///
/// Deadlines advance by a whole interval each tick. When the caller falls
/// behind, missed ticks are skipped rather than replayed in a burst.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    next_deadline: Instant,
    ticks: u64,
}

impl FrameClock {
    /// Creates a clock ticking `hz` times per second. `hz` is treated as at
    /// least one.
    pub fn new(hz: u32) -> Self {
        let interval = Duration::from_nanos(1_000_000_000 / u64::from(hz.max(1)));
        Self {
            interval,
            next_deadline: Instant::now() + interval,
            ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sleeps until the next tick boundary and returns the tick count.
    pub fn wait(&mut self) -> u64 {
        let now = Instant::now();
        if now < self.next_deadline {
            std::thread::sleep(self.next_deadline - now);
        }
        self.advance(Instant::now());
        self.ticks
    }

    fn advance(&mut self, now: Instant) {
        self.ticks += 1;
        self.next_deadline += self.interval;
        if self.next_deadline <= now {
            let behind = now - self.next_deadline;
            let skipped = behind.as_nanos() / self.interval.as_nanos().max(1) + 1;
            tracing::trace!(skipped = skipped as u64, "frame clock fell behind");
            self.next_deadline = now + self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_follows_rate() {
        let clock = FrameClock::new(50);
        assert_eq!(clock.interval(), Duration::from_millis(20));
        assert_eq!(FrameClock::new(0).interval(), Duration::from_secs(1));
    }

    #[test]
    fn wait_counts_ticks_and_paces() {
        let mut clock = FrameClock::new(200);
        let start = Instant::now();
        assert_eq!(clock.wait(), 1);
        assert_eq!(clock.wait(), 2);
        assert!(start.elapsed() >= Duration::from_millis(9));
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn missed_ticks_are_skipped_not_replayed() {
        let mut clock = FrameClock::new(100);
        let late = clock.next_deadline + Duration::from_millis(55);
        clock.advance(late);
        assert_eq!(clock.ticks(), 1);
        assert_eq!(clock.next_deadline, late + clock.interval());
    }
}
