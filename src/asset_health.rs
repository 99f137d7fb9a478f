//! `[ADDED]` Asset health aggregator (C16): combines multiple per-point
//! health records for one asset into a worst-case `AssetHealth` (grounded
//! on `original_source/health/asset_health_index.py`). Pure function, no
//! shared state.

use crate::domain::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointHealth {
    pub point: String,
    pub phi: f64,
    pub state: Severity,
}

/// `phi`/`state` are `None` when the asset has no reporting point yet —
/// this mirrors the original `asset_health_index.py`'s `UNKNOWN` case
/// rather than overloading `NORMAL`/`100.0` to mean "no data", since
/// `Severity` is the closed 4-value `StateLabel` (§3) and deliberately
/// carries no fifth "unknown" variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetHealth {
    pub asset: String,
    pub phi: Option<f64>,
    pub state: Option<Severity>,
    pub source_point: Option<String>,
}

/// Picks the entry with the lowest PHI (the worst-case point drives the
/// asset's overall health). An empty slice yields `phi: None, state: None`
/// — there is no point to report on, which is a distinct condition from a
/// healthy asset and must not be reported as one.
pub fn aggregate(asset: &str, points: &[PointHealth]) -> AssetHealth {
    match points.iter().min_by(|a, b| {
        a.phi
            .partial_cmp(&b.phi)
            .unwrap_or(std::cmp::Ordering::Equal)
    }) {
        Some(worst) => AssetHealth {
            asset: asset.to_string(),
            phi: Some(worst.phi),
            state: Some(worst.state),
            source_point: Some(worst.point.clone()),
        },
        None => AssetHealth {
            asset: asset.to_string(),
            phi: None,
            state: None,
            source_point: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_points_yield_unknown_health_not_normal() {
        let health = aggregate("A1", &[]);
        assert!(health.state.is_none());
        assert!(health.phi.is_none());
        assert!(health.source_point.is_none());
    }

    #[test]
    fn worst_phi_point_drives_asset_health() {
        let points = vec![
            PointHealth {
                point: "DE".into(),
                phi: 95.0,
                state: Severity::Normal,
            },
            PointHealth {
                point: "NDE".into(),
                phi: 40.0,
                state: Severity::Alarm,
            },
        ];
        let health = aggregate("A1", &points);
        assert_eq!(health.phi, Some(40.0));
        assert_eq!(health.state, Some(Severity::Alarm));
        assert_eq!(health.source_point.as_deref(), Some("NDE"));
    }
}
