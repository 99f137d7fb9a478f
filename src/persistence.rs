//! Persistence checker (C6): a hysteresis counter that turns instantaneous
//! trend evidence into a sustained level (§4.5). One-way escalation; only
//! the NORMAL clear rule demotes.

use crate::domain::{PointKey, Severity};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
struct PersistenceState {
    counter: i64,
    current: Severity,
}

impl Default for PersistenceState {
    fn default() -> Self {
        Self {
            counter: 0,
            current: Severity::Normal,
        }
    }
}

pub struct PersistenceStore {
    watch_limit: i64,
    warning_limit: i64,
    alarm_limit: i64,
    hysteresis_clear: i64,
    states: DashMap<PointKey, PersistenceState>,
}

impl PersistenceStore {
    pub fn new(watch_limit: i64, warning_limit: i64, alarm_limit: i64, hysteresis_clear: i64) -> Self {
        Self {
            watch_limit,
            warning_limit,
            alarm_limit,
            hysteresis_clear,
            states: DashMap::new(),
        }
    }

    /// Cumulative tick count (from NORMAL) at which a level is first
    /// reachable. `Normal` itself is the zero baseline the first promotion
    /// climbs from.
    fn cumulative_limit(&self, level: Severity) -> i64 {
        match level {
            Severity::Normal => 0,
            Severity::Watch => self.watch_limit,
            Severity::Warning => self.warning_limit,
            Severity::Alarm => self.alarm_limit,
        }
    }

    fn next_level(level: Severity) -> Option<Severity> {
        match level {
            Severity::Normal => Some(Severity::Watch),
            Severity::Watch => Some(Severity::Warning),
            Severity::Warning => Some(Severity::Alarm),
            Severity::Alarm => None,
        }
    }

    /// Apply one tick of `evidence_level` and return the new sustained
    /// level for `key` (§4.5).
    ///
    /// The counter resets to zero on every transition (promotion or
    /// clear), so that escalating step-by-step through N levels still
    /// takes exactly `alarm_limit` total non-NORMAL ticks from NORMAL
    /// (the per-step deltas telescope back to the configured cumulative
    /// limits — see T6), while recovery from *any* escalated level always
    /// takes exactly `hysteresis_clear` net-NORMAL ticks (T7), not a
    /// number that grows with how far the state had escalated.
    pub fn update(&self, key: &PointKey, evidence_level: Severity) -> Severity {
        let mut entry = self.states.entry(key.clone()).or_default();

        if evidence_level == Severity::Normal {
            entry.counter -= 1;
            if entry.counter <= -self.hysteresis_clear {
                entry.current = Severity::Normal;
                entry.counter = 0;
            }
        } else {
            entry.counter += 1;
            if let Some(next) = Self::next_level(entry.current) {
                let delta = self.cumulative_limit(next) - self.cumulative_limit(entry.current);
                if entry.counter >= delta.max(1) {
                    entry.current = next;
                    entry.counter = 0;
                }
            }
        }
        entry.current
    }

    pub fn current(&self, key: &PointKey) -> Severity {
        self.states.get(key).map(|s| s.current).unwrap_or(Severity::Normal)
    }

    pub fn counter(&self, key: &PointKey) -> i64 {
        self.states.get(key).map(|s| s.counter).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t6_persistence_monotone_alarm_at_exact_limit() {
        let store = PersistenceStore::new(3, 6, 10, 4);
        let key = PointKey::new("default", "P1", "DE");
        let mut last = Severity::Normal;
        for tick in 1..=10 {
            last = store.update(&key, Severity::Alarm);
            if tick < 10 {
                assert_ne!(last, Severity::Alarm, "tick {tick}");
            }
        }
        assert_eq!(last, Severity::Alarm);
    }

    #[test]
    fn t7_persistence_recovery_after_hysteresis_clear() {
        let store = PersistenceStore::new(1, 2, 3, 4);
        let key = PointKey::new("default", "P1", "DE");
        let mut last = Severity::Normal;
        for _ in 0..3 {
            last = store.update(&key, Severity::Alarm);
        }
        assert_eq!(last, Severity::Alarm, "3 escalating ticks should reach ALARM (T6)");

        for i in 1..=4 {
            let level = store.update(&key, Severity::Normal);
            if i < 4 {
                assert_eq!(level, Severity::Alarm, "tick {i}");
            } else {
                assert_eq!(level, Severity::Normal);
            }
        }
    }

    #[test]
    fn s4_persistence_scenario_from_spec() {
        let store = PersistenceStore::new(3, 6, 10, 4);
        let key = PointKey::new("default", "P1", "DE");
        let evidences = [
            Severity::Watch,
            Severity::Watch,
            Severity::Watch,
            Severity::Watch,
            Severity::Watch,
            Severity::Watch,
            Severity::Normal,
            Severity::Normal,
            Severity::Normal,
            Severity::Normal,
        ];
        let expected = [
            Severity::Normal,
            Severity::Normal,
            Severity::Watch,
            Severity::Watch,
            Severity::Watch,
            Severity::Warning,
            Severity::Warning,
            Severity::Warning,
            Severity::Warning,
            Severity::Normal,
        ];
        for (i, (&ev, &exp)) in evidences.iter().zip(expected.iter()).enumerate() {
            let got = store.update(&key, ev);
            assert_eq!(got, exp, "tick {i}");
        }
    }

    #[test]
    fn current_only_demotes_via_clear_rule() {
        let store = PersistenceStore::new(1, 2, 3, 100);
        let key = PointKey::new("default", "P1", "DE");
        let mut last = Severity::Normal;
        for _ in 0..3 {
            last = store.update(&key, Severity::Alarm);
        }
        assert_eq!(last, Severity::Alarm);
        let level = store.update(&key, Severity::Normal);
        assert_eq!(level, Severity::Alarm, "one normal tick should not demote");
    }
}
