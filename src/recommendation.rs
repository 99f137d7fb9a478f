//! `[ADDED]` Recommendation port (C15): a pure lookup over a configured
//! table — per-state defaults merged with per-fault overrides, text
//! language-keyed with English fallback (§6 Recommendation port; grounded
//! on `original_source/analytics/recommendation/recommendation_engine.py`).

use crate::domain::{FaultType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub level: Severity,
    pub priority: u8,
    pub action_code: String,
    pub text: String,
}

pub trait RecommendationPort: Send + Sync {
    fn recommend(
        &self,
        state: Severity,
        fault_type: FaultType,
        confidence: Option<f64>,
        phi: Option<f64>,
        lang: &str,
    ) -> Recommendation;
}

#[derive(Debug, Clone)]
struct TableEntry {
    priority: u8,
    action_code: String,
    text: HashMap<String, String>,
}

impl TableEntry {
    fn text_for(&self, lang: &str) -> String {
        self.text
            .get(lang)
            .or_else(|| self.text.get("en"))
            .cloned()
            .unwrap_or_default()
    }
}

/// Default, config-loadable recommendation table. Per-state entries are
/// the fallback; a `(state, fault_type)` override, when present, wins.
pub struct TableRecommendationPort {
    defaults: HashMap<Severity, TableEntry>,
    overrides: HashMap<(Severity, FaultType), TableEntry>,
}

fn en(text: &str) -> HashMap<String, String> {
    HashMap::from([("en".to_string(), text.to_string())])
}

impl Default for TableRecommendationPort {
    fn default() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(
            Severity::Normal,
            TableEntry {
                priority: 0,
                action_code: "NONE".into(),
                text: en("No action required; equipment is within normal operating limits."),
            },
        );
        defaults.insert(
            Severity::Watch,
            TableEntry {
                priority: 1,
                action_code: "MONITOR".into(),
                text: en("Early trend deviation detected; continue monitoring."),
            },
        );
        defaults.insert(
            Severity::Warning,
            TableEntry {
                priority: 2,
                action_code: "SCHEDULE_INSPECTION".into(),
                text: en("Sustained degradation detected; schedule an inspection."),
            },
        );
        defaults.insert(
            Severity::Alarm,
            TableEntry {
                priority: 3,
                action_code: "IMMEDIATE_ACTION".into(),
                text: en("Severe condition detected; take immediate corrective action."),
            },
        );

        let mut overrides = HashMap::new();
        overrides.insert(
            (Severity::Alarm, FaultType::BearingDegradation),
            TableEntry {
                priority: 4,
                action_code: "REPLACE_BEARING".into(),
                text: en("Bearing degradation signature detected; plan a bearing replacement."),
            },
        );
        overrides.insert(
            (Severity::Warning, FaultType::Imbalance),
            TableEntry {
                priority: 2,
                action_code: "BALANCE_ROTOR".into(),
                text: en("Imbalance signature detected; schedule rotor balancing."),
            },
        );
        overrides.insert(
            (Severity::Warning, FaultType::Misalignment),
            TableEntry {
                priority: 2,
                action_code: "CHECK_ALIGNMENT".into(),
                text: en("Misalignment signature detected; verify shaft alignment."),
            },
        );
        overrides.insert(
            (Severity::Alarm, FaultType::Looseness),
            TableEntry {
                priority: 3,
                action_code: "CHECK_MOUNTING".into(),
                text: en("Mechanical looseness signature detected; inspect mounting and fasteners."),
            },
        );

        Self { defaults, overrides }
    }
}

impl RecommendationPort for TableRecommendationPort {
    fn recommend(
        &self,
        state: Severity,
        fault_type: FaultType,
        confidence: Option<f64>,
        phi: Option<f64>,
        lang: &str,
    ) -> Recommendation {
        let _ = (confidence, phi); // reserved for future per-confidence text variants
        let entry = self
            .overrides
            .get(&(state, fault_type))
            .or_else(|| self.defaults.get(&state))
            .expect("defaults cover every Severity variant");

        Recommendation {
            level: state,
            priority: entry.priority,
            action_code: entry.action_code.clone(),
            text: entry.text_for(lang),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_state_default_without_override() {
        let port = TableRecommendationPort::default();
        let rec = port.recommend(Severity::Watch, FaultType::GeneralHealth, None, None, "en");
        assert_eq!(rec.action_code, "MONITOR");
    }

    #[test]
    fn fault_specific_override_wins() {
        let port = TableRecommendationPort::default();
        let rec = port.recommend(Severity::Alarm, FaultType::BearingDegradation, None, None, "en");
        assert_eq!(rec.action_code, "REPLACE_BEARING");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let port = TableRecommendationPort::default();
        let rec = port.recommend(Severity::Normal, FaultType::GeneralHealth, None, None, "fr");
        assert!(rec.text.contains("normal operating limits"));
    }
}
