//! PHI computer + state map (C8): a deterministic severity score in
//! `[0, 100]` and its ISO-style state label (§4.7). Pure function of a
//! FeatureVector — no shared state, reproducible from the window alone.
//!
//! PHI is health, not severity: higher is better. (§9 notes two competing
//! formulations exist upstream; this is the one the spec adopts.)

use crate::config::PhiConfig;
use crate::domain::Severity;
use crate::features::FeatureVector;

/// `compute_phi` per §4.7: weighted severity from velocity, envelope, and
/// crest-factor ratios, inverted to a health score and rounded to 0.1.
pub fn compute_phi(features: &FeatureVector, cfg: &PhiConfig) -> f64 {
    let vel = (features.overall_vel_rms_mm_s / cfg.vel_norm_mm_s).min(1.0);
    let env = (features.envelope_rms / cfg.env_norm_g).min(1.0);
    let crest = (features.crest_factor / cfg.crest_norm).min(1.0);

    let severity = cfg.weight_vel * vel + cfg.weight_env * env + cfg.weight_crest * crest;
    let phi = 100.0 * (1.0 - severity);
    let rounded = (phi * 10.0).round() / 10.0;
    rounded.clamp(0.0, 100.0)
}

/// `phi_to_state` per §4.7: boundaries closed on the upper side.
pub fn phi_to_state(phi: f64, cfg: &PhiConfig) -> Severity {
    if phi >= cfg.normal_min {
        Severity::Normal
    } else if phi >= cfg.watch_min {
        Severity::Watch
    } else if phi >= cfg.warning_min {
        Severity::Warning
    } else {
        Severity::Alarm
    }
}
