//! L1 feature pipeline (C3): one Window → a deterministic FeatureVector in
//! SI units (§4.2).

use crate::config::defaults::{GRAVITY, HF_BAND, HIGH_ENERGY_BAND, LOW_ENERGY_BAND};
use crate::domain::FEATURE_KEYS;
use crate::ring_buffer::Window;
use crate::signal;
use serde::{Deserialize, Serialize};

/// A fixed ordered key set of physical features computed from one Window
/// (§3 FeatureVector). All values are finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub acc_rms_g: f64,
    pub acc_peak_g: f64,
    pub acc_hf_rms_g: f64,
    pub crest_factor: f64,
    pub envelope_rms: f64,
    pub overall_vel_rms_mm_s: f64,
    pub energy_low: f64,
    pub energy_high: f64,
    /// Wall-clock seconds at computation time.
    pub timestamp: f64,
}

impl FeatureVector {
    /// The canonical zero vector (§3 invariant: empty/all-zero window ⇒
    /// every feature exactly 0.0, no NaN).
    pub fn zero(timestamp: f64) -> Self {
        Self {
            acc_rms_g: 0.0,
            acc_peak_g: 0.0,
            acc_hf_rms_g: 0.0,
            crest_factor: 0.0,
            envelope_rms: 0.0,
            overall_vel_rms_mm_s: 0.0,
            energy_low: 0.0,
            energy_high: 0.0,
            timestamp,
        }
    }

    /// Look up a feature by its §3 key name. Returns `None` for an unknown
    /// key (callers should only ever pass names from [`FEATURE_KEYS`]).
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "acc_rms_g" => Some(self.acc_rms_g),
            "acc_peak_g" => Some(self.acc_peak_g),
            "acc_hf_rms_g" => Some(self.acc_hf_rms_g),
            "crest_factor" => Some(self.crest_factor),
            "envelope_rms" => Some(self.envelope_rms),
            "overall_vel_rms_mm_s" => Some(self.overall_vel_rms_mm_s),
            "energy_low" => Some(self.energy_low),
            "energy_high" => Some(self.energy_high),
            _ => None,
        }
    }

    /// True iff every feature is finite and non-negative (T1 feature
    /// totality, modulo crest_factor which is always ≥ 0 too).
    pub fn is_well_formed(&self) -> bool {
        FEATURE_KEYS
            .iter()
            .filter_map(|k| self.get(k))
            .all(|v| v.is_finite() && v >= 0.0)
    }
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Compute the L1 feature vector for one window (§4.2). `fs` is the
/// sampling rate in Hz. An empty window returns the canonical zero vector
/// (T2 zero-input safety).
pub fn compute_features(window: &Window, fs: f64) -> FeatureVector {
    let timestamp = now_secs();
    if window.is_empty() {
        return FeatureVector::zero(timestamp);
    }

    let n = window.len() as f64;
    let acc_rms_g = signal::rms(window);
    let acc_peak_g = signal::peak_to_peak_half(window);

    let hf_energy = signal::bandpass_energy(window, fs, HF_BAND.0, HF_BAND.1);
    let acc_hf_rms_g = if hf_energy > 0.0 {
        (hf_energy / n).sqrt()
    } else {
        0.0
    };

    let crest_factor = if acc_rms_g > 0.0 {
        acc_peak_g / acc_rms_g
    } else {
        0.0
    };

    let envelope_rms = signal::hilbert_envelope_rms(window);

    let accel_si: Vec<f64> = window.iter().map(|g| g * GRAVITY).collect();
    let velocity = signal::cumulative_integrate_detrend(&accel_si, fs);
    let overall_vel_rms_mm_s = signal::rms(&velocity) * 1000.0;

    let energy_low = signal::bandpass_energy(window, fs, LOW_ENERGY_BAND.0, LOW_ENERGY_BAND.1);
    let energy_high = signal::bandpass_energy(window, fs, HIGH_ENERGY_BAND.0, HIGH_ENERGY_BAND.1);

    let fv = FeatureVector {
        acc_rms_g: clamp_finite(acc_rms_g),
        acc_peak_g: clamp_finite(acc_peak_g),
        acc_hf_rms_g: clamp_finite(acc_hf_rms_g),
        crest_factor: clamp_finite(crest_factor),
        envelope_rms: clamp_finite(envelope_rms),
        overall_vel_rms_mm_s: clamp_finite(overall_vel_rms_mm_s),
        energy_low: clamp_finite(energy_low),
        energy_high: clamp_finite(energy_high),
        timestamp,
    };
    debug_assert!(fv.is_well_formed());
    fv
}

/// Non-finite (NaN from e.g. an all-zero RMS denominator) collapses to
/// 0.0 — §4.2 requires every feature value to be finite (NumericDegenerate,
/// §7).
fn clamp_finite(v: f64) -> f64 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        0.0
    }
}
