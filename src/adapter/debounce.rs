//! A trailing debounce for the pause-overlay message, so rapid pause/resume
//! cycles don't flicker the IDE overlay.

use std::time::{Duration, Instant};

pub struct Debouncer {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_fired: None }
    }

    pub fn overlay(now: Instant) -> Self {
        let _ = now;
        Self::new(Duration::from_millis(200))
    }

    /// Returns `true` if enough time has elapsed since the last fire to
    /// allow this one through, and records `now` as the new last-fire time
    /// when it does.
    pub fn should_fire(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_first_call() {
        let mut d = Debouncer::new(Duration::from_millis(200));
        assert!(d.should_fire(Instant::now()));
    }

    #[test]
    fn suppresses_calls_within_the_interval() {
        let mut d = Debouncer::new(Duration::from_millis(200));
        let t0 = Instant::now();
        assert!(d.should_fire(t0));
        assert!(!d.should_fire(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn fires_again_after_the_interval_elapses() {
        let mut d = Debouncer::new(Duration::from_millis(200));
        let t0 = Instant::now();
        assert!(d.should_fire(t0));
        assert!(d.should_fire(t0 + Duration::from_millis(201)));
    }
}
