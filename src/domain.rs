//! Closed enumerations shared across the pipeline (§9: "No dynamic type
//! juggling — variant types become closed enumerations").
//!
//! `Severity` backs four distinct spec concepts that all live on the same
//! four-point scale (NORMAL < WATCH < WARNING < ALARM): the trend level
//! (§4.4), the persistence-checker's sustained level (§4.5), the
//! early-fault FSM state (§4.6), and the PHI state map (§4.7). Declaration
//! order doubles as severity order, which is what "worst level across
//! monitored features" and "trend level ≥ target" comparisons need.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Normal,
    Watch,
    Warning,
    Alarm,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Normal => "NORMAL",
            Severity::Watch => "WATCH",
            Severity::Warning => "WARNING",
            Severity::Alarm => "ALARM",
        };
        write!(f, "{s}")
    }
}

/// `[ADDED]` Diagnostic fault classification (C14), grounded on the
/// original system's L2 diagnostic rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    BearingDegradation,
    Imbalance,
    Misalignment,
    Looseness,
    GeneralHealth,
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultType::BearingDegradation => "bearing_degradation",
            FaultType::Imbalance => "imbalance",
            FaultType::Misalignment => "misalignment",
            FaultType::Looseness => "looseness",
            FaultType::GeneralHealth => "general_health",
        };
        write!(f, "{s}")
    }
}

/// The fixed ordered feature key set (§3 FeatureVector). Order matters for
/// the trend detector's tie-break rule ("ties broken by the lexical order
/// defined in §3").
pub const FEATURE_KEYS: [&str; 8] = [
    "acc_rms_g",
    "acc_peak_g",
    "acc_hf_rms_g",
    "crest_factor",
    "envelope_rms",
    "overall_vel_rms_mm_s",
    "energy_low",
    "energy_high",
];

/// A `(site, asset, point)` key identifying one monitored measurement point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointKey {
    pub site: String,
    pub asset: String,
    pub point: String,
}

impl PointKey {
    pub fn new(site: impl Into<String>, asset: impl Into<String>, point: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            asset: asset.into(),
            point: point.into(),
        }
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site, self.asset, self.point)
    }
}

/// Raw ingress sample batch (§3 SamplePacket). `acceleration` must be
/// non-empty and finite; packets that fail that invariant are dropped
/// silently (and counted) by the ring buffer registry / ingress adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplePacket {
    pub site: String,
    pub asset: String,
    pub point: String,
    #[serde(default)]
    pub rpm: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    pub acceleration: Vec<f64>,
}

impl SamplePacket {
    pub fn key(&self) -> PointKey {
        PointKey::new(self.site.clone(), self.asset.clone(), self.point.clone())
    }

    /// True iff the packet satisfies the §3 invariant: non-empty,
    /// all-finite acceleration.
    pub fn is_valid(&self) -> bool {
        !self.acceleration.is_empty() && self.acceleration.iter().all(|v| v.is_finite())
    }
}
