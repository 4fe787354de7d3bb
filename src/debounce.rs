use std::time::{Duration, Instant};

/// Postpones an action until `wait` has passed since the last trigger.
///
/// Polled once per frame from the UI loop.
#[derive(Debug, Clone)]
pub struct Debouncer {
    wait: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            deadline: None,
        }
    }

    /// Restart the countdown.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.wait);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Time left before the action fires, if one is pending.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Returns `true` once per trigger, when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_wait() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.trigger(t0);
        assert!(!d.poll(t0 + Duration::from_millis(50)));
        assert!(d.poll(t0 + Duration::from_millis(100)));
        assert!(!d.poll(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn retrigger_postpones() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(100));
        d.trigger(t0);
        d.trigger(t0 + Duration::from_millis(80));
        assert!(!d.poll(t0 + Duration::from_millis(120)));
        assert_eq!(
            d.remaining(t0 + Duration::from_millis(120)),
            Some(Duration::from_millis(60))
        );
        assert!(d.poll(t0 + Duration::from_millis(180)));
    }

    #[test]
    fn cancel_clears_pending_action() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::ZERO);
        d.trigger(t0);
        d.cancel();
        assert!(!d.poll(t0));
        assert_eq!(d.remaining(t0), None);
    }
}
