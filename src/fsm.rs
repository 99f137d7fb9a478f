//! Early-fault FSM (C7): combines a TrendRecord and the persistence
//! checker's sustained level into a FaultEvidence record (§4.6).
//!
//! This FSM is evidence only — it never drives the SCADA-visible alarm.
//! PHI is that authority (§4.7, §9).

use crate::domain::Severity;
use crate::trend::TrendRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultEvidence {
    pub state: Severity,
    pub confidence: f64,
    pub dominant_feature: &'static str,
    pub timestamp: f64,
}

/// Stateless: the FSM's only "state" lives in the persistence counter it is
/// handed each tick, so there is nothing to shard or lock here.
pub struct EarlyFaultFsm {
    alarm_limit: i64,
}

impl EarlyFaultFsm {
    pub fn new(alarm_limit: i64) -> Self {
        Self { alarm_limit }
    }

    /// Transition rule (§4.6): the target is the persistence checker's
    /// sustained level, but it is only *taken* if the trend record agrees
    /// (`trend.level >= target`) — this blocks a phantom escalation where
    /// persistence says ALARM from a stale tick but the current window has
    /// already recovered.
    pub fn update(&self, trend: &TrendRecord, sustained: Severity, counter: i64, timestamp: f64) -> FaultEvidence {
        let state = if trend.level >= sustained { sustained } else {
            // trend disagrees with the sustained level; stay at whatever
            // the trend itself currently supports, never above it.
            trend.level.min(sustained)
        };

        let confidence = confidence_for(state, counter, self.alarm_limit);

        FaultEvidence {
            state,
            confidence,
            dominant_feature: trend.dominant_feature,
            timestamp,
        }
    }
}

/// Confidence is a monotone function of the persistence counter over the
/// alarm threshold, clamped to `[0, 1]`. NORMAL evidence always reports 0.
fn confidence_for(state: Severity, counter: i64, alarm_limit: i64) -> f64 {
    if state == Severity::Normal || alarm_limit <= 0 {
        return 0.0;
    }
    (counter as f64 / alarm_limit as f64).clamp(0.0, 1.0)
}
