//! Adaptive baseline (C4): an exponentially-weighted per-feature reference
//! value per `(site, asset, point)`, updated only on NORMAL evidence so a
//! developing fault cannot poison its own baseline (§4.3).

use crate::domain::{PointKey, FEATURE_KEYS};
use dashmap::DashMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct FeatureBaseline {
    mu: f64,
    n: u64,
}

/// Per-point, per-feature exponential baseline. Sharded by `PointKey`
/// (§5: no global lock).
pub struct BaselineStore {
    alpha: f64,
    min_samples: u64,
    points: DashMap<PointKey, HashMap<&'static str, FeatureBaseline>>,
}

impl BaselineStore {
    pub fn new(alpha: f64, min_samples: u64) -> Self {
        Self {
            alpha,
            min_samples,
            points: DashMap::new(),
        }
    }

    /// Update every tracked feature's baseline from `values` (keyed by the
    /// §3 feature names). When `allow_update` is false, state is
    /// untouched. Non-finite values are ignored even when `allow_update` is
    /// true.
    pub fn update(&self, key: &PointKey, values: &HashMap<&'static str, f64>, allow_update: bool) {
        if !allow_update {
            return;
        }
        let mut entry = self.points.entry(key.clone()).or_default();
        for &feature in FEATURE_KEYS.iter() {
            let Some(&value) = values.get(feature) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            match entry.get_mut(feature) {
                Some(b) => {
                    b.mu = (1.0 - self.alpha) * b.mu + self.alpha * value;
                    b.n += 1;
                }
                None => {
                    entry.insert(feature, FeatureBaseline { mu: value, n: 1 });
                }
            }
        }
    }

    /// `(mean, sample_count, warming)` for one feature, or `None` if the
    /// point/feature has never been admitted.
    pub fn query(&self, key: &PointKey, feature: &str) -> Option<(f64, u64, bool)> {
        let entry = self.points.get(key)?;
        let b = entry.get(feature)?;
        Some((b.mu, b.n, b.n < self.min_samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(v: f64) -> HashMap<&'static str, f64> {
        FEATURE_KEYS.iter().map(|&k| (k, v)).collect()
    }

    #[test]
    fn t5_baseline_gating_no_update_when_disallowed() {
        let store = BaselineStore::new(0.5, 3);
        let key = PointKey::new("default", "P1", "DE");
        store.update(&key, &values(10.0), false);
        assert!(store.query(&key, "acc_rms_g").is_none());
    }

    #[test]
    fn first_admitted_sample_becomes_initial_mean() {
        let store = BaselineStore::new(0.1, 5);
        let key = PointKey::new("default", "P1", "DE");
        store.update(&key, &values(3.0), true);
        let (mu, n, warming) = store.query(&key, "acc_rms_g").unwrap();
        assert_eq!(mu, 3.0);
        assert_eq!(n, 1);
        assert!(warming);
    }

    #[test]
    fn warming_clears_once_min_samples_reached() {
        let store = BaselineStore::new(0.2, 3);
        let key = PointKey::new("default", "P1", "DE");
        for _ in 0..3 {
            store.update(&key, &values(1.0), true);
        }
        let (_, n, warming) = store.query(&key, "acc_rms_g").unwrap();
        assert_eq!(n, 3);
        assert!(!warming);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let store = BaselineStore::new(0.5, 1);
        let key = PointKey::new("default", "P1", "DE");
        let mut vals = values(1.0);
        vals.insert("acc_rms_g", f64::NAN);
        store.update(&key, &vals, true);
        assert!(store.query(&key, "acc_rms_g").is_none());
        assert!(store.query(&key, "acc_peak_g").is_some());
    }

    #[test]
    fn subsequent_updates_move_mean_toward_new_values() {
        let store = BaselineStore::new(0.5, 10);
        let key = PointKey::new("default", "P1", "DE");
        store.update(&key, &values(0.0), true);
        store.update(&key, &values(10.0), true);
        let (mu, ..) = store.query(&key, "acc_rms_g").unwrap();
        assert_eq!(mu, 5.0);
    }
}
