//! Heartbeat (C12): monotonic pipeline-phase timestamps, snapshot for
//! egress on the `vibration/system/heartbeat` topic (§6).

use dashmap::DashMap;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point-in-time snapshot of the last wall-clock timestamp recorded at
/// each named pipeline phase (`raw_rx`, `window_ready`, `l1_exec`,
/// `publish_l1`, `publish_health`, ...).
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatSnapshot {
    pub service: String,
    pub phase_timestamps: std::collections::HashMap<String, f64>,
}

pub struct HeartbeatTracker {
    service: String,
    phases: DashMap<&'static str, f64>,
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl HeartbeatTracker {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            phases: DashMap::new(),
        }
    }

    /// Record `now()` against `phase`.
    pub fn mark(&self, phase: &'static str) {
        self.phases.insert(phase, now_secs());
    }

    pub fn snapshot(&self) -> HeartbeatSnapshot {
        HeartbeatSnapshot {
            service: self.service.clone(),
            phase_timestamps: self
                .phases
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_snapshot_round_trips() {
        let hb = HeartbeatTracker::new("vibralyzer");
        hb.mark("raw_rx");
        let snap = hb.snapshot();
        assert_eq!(snap.service, "vibralyzer");
        assert!(snap.phase_timestamps.contains_key("raw_rx"));
    }
}
