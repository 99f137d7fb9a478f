//! `[ADDED]` Fault diagnosis (C14): classifies a FeatureVector + PHI state
//! into a [`FaultType`] for L2 jobs and the health/early-fault egress
//! records. Grounded on the original system's L2 diagnostic rule engine
//! (`original_source/diagnostic_l2/{fault_rules.py,diagnostic_engine.py}`).
//!
//! Pure function, no shared state; evaluates an ordered rule list and
//! falls through to [`FaultType::GeneralHealth`] when nothing matches.

use crate::domain::{FaultType, Severity};
use crate::features::FeatureVector;

/// Tunable floors for the rule list. Not currently configuration-fed (the
/// spec leaves this port's internals free, §1) but kept as named constants
/// rather than inlined magic numbers.
pub struct FaultRuleThresholds {
    pub hf_floor_g: f64,
    pub envelope_floor_g: f64,
    pub vel_high_mm_s: f64,
    pub crest_low: f64,
    pub peak_high_g: f64,
    pub crest_high: f64,
}

impl Default for FaultRuleThresholds {
    fn default() -> Self {
        Self {
            hf_floor_g: 0.05,
            envelope_floor_g: 0.1,
            vel_high_mm_s: 4.5,
            crest_low: 3.0,
            peak_high_g: 1.0,
            crest_high: 5.0,
        }
    }
}

/// Evaluate the ordered rule list against one feature vector and the PHI
/// state it produced. Order matters: bearing degradation is checked first
/// because it is the most safety-critical classification.
pub fn diagnose(features: &FeatureVector, state: Severity, thresholds: &FaultRuleThresholds) -> FaultType {
    if state == Severity::Alarm
        && features.acc_hf_rms_g > thresholds.hf_floor_g
        && features.envelope_rms > thresholds.envelope_floor_g
    {
        return FaultType::BearingDegradation;
    }

    if state >= Severity::Warning
        && features.overall_vel_rms_mm_s > thresholds.vel_high_mm_s
        && features.crest_factor < thresholds.crest_low
    {
        return FaultType::Imbalance;
    }

    if state >= Severity::Warning
        && features.overall_vel_rms_mm_s > thresholds.vel_high_mm_s
        && features.acc_peak_g > thresholds.peak_high_g
    {
        return FaultType::Misalignment;
    }

    if state == Severity::Alarm && features.crest_factor > thresholds.crest_high {
        return FaultType::Looseness;
    }

    FaultType::GeneralHealth
}
