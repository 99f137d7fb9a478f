//! L2 cooldown (C10): minimum re-trigger interval per `(site, asset,
//! point, state)` (§4.9). Prevents a single sustained event from flooding
//! the diagnostic pipeline.

use crate::domain::{PointKey, Severity};
use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct CooldownTracker {
    warning: Duration,
    alarm: Duration,
    last_trigger: DashMap<(PointKey, Severity), Instant>,
}

impl CooldownTracker {
    pub fn new(warning: Duration, alarm: Duration) -> Self {
        Self {
            warning,
            alarm,
            last_trigger: DashMap::new(),
        }
    }

    fn cooldown_for(&self, state: Severity) -> Duration {
        match state {
            Severity::Alarm => self.alarm,
            _ => self.warning,
        }
    }

    /// True iff enough time has passed since the last trigger for `(key,
    /// state)` — or there has never been one.
    pub fn can_trigger(&self, key: &PointKey, state: Severity, now: Instant) -> bool {
        match self.last_trigger.get(&(key.clone(), state)) {
            Some(last) => now.duration_since(*last) >= self.cooldown_for(state),
            None => true,
        }
    }

    pub fn mark_triggered(&self, key: &PointKey, state: Severity, now: Instant) {
        self.last_trigger.insert((key.clone(), state), now);
    }
}
