//! Trend detector (C5): classifies one FeatureVector against its point's
//! baseline into NORMAL/WATCH/WARNING/ALARM per feature, then takes the
//! worst level across all features (§4.4).
//!
//! Per-feature thresholds are configuration (§9 open question); lacking
//! configuration this uses the documented default baseline-ratio
//! thresholds of 1.3 / 1.6 / 2.0 for WATCH/WARNING/ALARM
//! (`config::defaults::TREND_*_RATIO`).

use crate::baseline::BaselineStore;
use crate::config::TrendThresholds;
use crate::domain::{PointKey, Severity, FEATURE_KEYS};
use crate::features::FeatureVector;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TrendRecord {
    pub level: Severity,
    pub dominant_feature: &'static str,
    pub magnitudes: HashMap<&'static str, f64>,
}

pub struct TrendDetector {
    thresholds: TrendThresholds,
}

impl TrendDetector {
    pub fn new(thresholds: TrendThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify `features` against `baseline`'s current reference for
    /// `key`. A feature with no baseline yet (or a zero baseline mean) is
    /// treated as NORMAL — there is nothing to compare against; its ratio
    /// is reported as `1.0` for observability.
    pub fn evaluate(
        &self,
        baseline: &BaselineStore,
        key: &PointKey,
        features: &FeatureVector,
    ) -> TrendRecord {
        let mut magnitudes = HashMap::with_capacity(FEATURE_KEYS.len());
        let mut worst = Severity::Normal;
        let mut dominant = FEATURE_KEYS[0];

        for &feature in FEATURE_KEYS.iter() {
            let Some(value) = features.get(feature) else {
                continue;
            };
            let ratio = match baseline.query(key, feature) {
                Some((mu, _, _)) if mu > 0.0 => value / mu,
                _ => 1.0,
            };
            magnitudes.insert(feature, ratio);

            let level = self.level_for_ratio(ratio);
            if level > worst {
                worst = level;
                dominant = feature;
            }
        }

        TrendRecord {
            level: worst,
            dominant_feature: dominant,
            magnitudes,
        }
    }

    fn level_for_ratio(&self, ratio: f64) -> Severity {
        if ratio >= self.thresholds.alarm_ratio {
            Severity::Alarm
        } else if ratio >= self.thresholds.warning_ratio {
            Severity::Warning
        } else if ratio >= self.thresholds.watch_ratio {
            Severity::Watch
        } else {
            Severity::Normal
        }
    }
}
