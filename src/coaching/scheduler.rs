use tokio::time::{Duration, Instant};

pub const DEFAULT_MINIMUM_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_NOMINAL_INTERVAL: Duration = Duration::from_millis(3000);

/// Spacing policy between coaching cycles.
///
/// Cycles never start closer than `minimum_interval` apart, measured from
/// the start of the previous analysis. There is no fixed phase: once the
/// minimum has elapsed the next cycle may start immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateScheduler {
    minimum_interval: Duration,
    nominal_interval: Duration,
}

impl Default for RateScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_INTERVAL, DEFAULT_NOMINAL_INTERVAL)
    }
}

impl RateScheduler {
    pub fn new(minimum_interval: Duration, nominal_interval: Duration) -> Self {
        Self {
            minimum_interval,
            nominal_interval,
        }
    }

    pub fn minimum_interval(&self) -> Duration {
        self.minimum_interval
    }

    pub fn nominal_interval(&self) -> Duration {
        self.nominal_interval
    }

    /// `max(0, minimum - (now - last))`; a loop that has never run starts
    /// right away.
    pub fn delay_until_next(&self, last_cycle: Option<Instant>, now: Instant) -> Duration {
        match last_cycle {
            Some(last) => self
                .minimum_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Re-arm delay for a cycle that did no work (camera not ready). Keeps
    /// an unready camera from spinning the loop.
    pub fn idle_delay(&self) -> Duration {
        self.nominal_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_out_the_rest_of_the_minimum_interval() {
        let scheduler = RateScheduler::default();
        let last = Instant::now();
        assert_eq!(
            scheduler.delay_until_next(Some(last), last + Duration::from_millis(500)),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn late_cycles_catch_up_immediately() {
        let scheduler = RateScheduler::default();
        let last = Instant::now();
        assert_eq!(
            scheduler.delay_until_next(Some(last), last + Duration::from_millis(3000)),
            Duration::ZERO
        );
        assert_eq!(
            scheduler.delay_until_next(Some(last), last + Duration::from_millis(2000)),
            Duration::ZERO
        );
    }

    #[test]
    fn never_run_means_no_delay() {
        let scheduler = RateScheduler::default();
        assert_eq!(scheduler.delay_until_next(None, Instant::now()), Duration::ZERO);
    }

    #[test]
    fn clock_skew_before_last_cycle_waits_full_minimum() {
        let scheduler = RateScheduler::new(Duration::from_millis(800), Duration::from_secs(1));
        let now = Instant::now();
        let last = now + Duration::from_millis(100);
        assert_eq!(
            scheduler.delay_until_next(Some(last), now),
            Duration::from_millis(800)
        );
        assert_eq!(scheduler.idle_delay(), Duration::from_secs(1));
    }
}
