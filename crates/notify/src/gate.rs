//! Burst/duplicate gating for notifications.
//!
//! Three independent gates, all measured against a caller-supplied clock so
//! they are testable: a per-title duplicate window, a minimum gap between
//! any two deliveries, and a suppress window armed when the user clears
//! unread (the desktop equivalent of clicking the toast).

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parrot_config::schema::NotifyConfig;

pub struct NotifyGate {
    dedup_window: Duration,
    min_gap: Duration,
    suppress_window: Duration,
    last_by_title: HashMap<String, Instant>,
    suppress_until: Option<Instant>,
    cooldown_until: Option<Instant>,
}

impl NotifyGate {
    pub fn new(cfg: &NotifyConfig) -> Self {
        Self {
            dedup_window: Duration::from_millis(cfg.dedup_window_ms),
            min_gap: Duration::from_millis(cfg.min_gap_ms),
            suppress_window: Duration::from_millis(cfg.suppress_ms),
            last_by_title: HashMap::new(),
            suppress_until: None,
            cooldown_until: None,
        }
    }

    /// Whether a notification with `title` may go out at `now`. On approval
    /// the gate records the delivery and arms the cooldown.
    pub fn allow(&mut self, title: &str, now: Instant) -> bool {
        if let Some(until) = self.suppress_until
            && now < until
        {
            return false;
        }
        if let Some(last) = self.last_by_title.get(title)
            && now.duration_since(*last) < self.dedup_window
        {
            return false;
        }
        if let Some(until) = self.cooldown_until
            && now < until
        {
            // Drop rather than defer, so the platform never queues a burst.
            return false;
        }

        self.last_by_title.insert(title.to_owned(), now);
        self.cooldown_until = Some(now + self.min_gap);
        true
    }

    /// Arm the suppress window (called when unread is cleared).
    pub fn suppress(&mut self, now: Instant) {
        self.suppress_until = Some(now + self.suppress_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> NotifyGate {
        NotifyGate::new(&NotifyConfig {
            dedup_window_ms: 3_000,
            min_gap_ms: 8_000,
            suppress_ms: 1_500,
        })
    }

    #[test]
    fn duplicate_title_within_window_is_dropped() {
        let mut g = gate();
        let t0 = Instant::now();
        assert!(g.allow("mention", t0));
        assert!(!g.allow("mention", t0 + Duration::from_secs(2)));
        assert!(g.allow("mention", t0 + Duration::from_secs(10)));
    }

    #[test]
    fn min_gap_applies_across_titles() {
        let mut g = gate();
        let t0 = Instant::now();
        assert!(g.allow("a", t0));
        assert!(!g.allow("b", t0 + Duration::from_secs(4)));
        assert!(g.allow("b", t0 + Duration::from_secs(9)));
    }

    #[test]
    fn suppress_window_blocks_everything() {
        let mut g = gate();
        let t0 = Instant::now();
        g.suppress(t0);
        assert!(!g.allow("a", t0 + Duration::from_millis(500)));
        assert!(g.allow("a", t0 + Duration::from_millis(2_000)));
    }
}
