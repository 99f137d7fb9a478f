//! Egress port (C13): an abstract sink with the fixed set of publish
//! operations named in §6/§9. Any implementation meeting this trait — the
//! real MQTT transport, an in-memory test sink, a Sparkplug adapter — is
//! acceptable; the transport itself is out of scope for this crate (§1).

use crate::domain::{FaultType, Severity};
use crate::features::FeatureVector;
use crate::fsm::FaultEvidence;
use crate::heartbeat::HeartbeatSnapshot;
use crate::recommendation::Recommendation;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
pub struct HealthEvent {
    pub point_health_index: f64,
    pub state: Severity,
    pub fsm_state: Severity,
    pub fault_type: Option<FaultType>,
    pub confidence: f64,
    pub timestamp: f64,
}

/// The capability set every egress implementation must provide (§9 "Design
/// Notes — Polymorphic egress"). Orchestrator callers copy the payload and
/// release their per-key lock before calling these — publish may block on
/// the transport (§5).
#[async_trait]
pub trait EgressPort: Send + Sync {
    async fn publish_l1(&self, site: &str, asset: &str, point: &str, features: &FeatureVector);
    async fn publish_health(&self, site: &str, asset: &str, point: &str, health: &HealthEvent);
    async fn publish_recommendation(
        &self,
        site: &str,
        asset: &str,
        point: &str,
        recommendation: &Recommendation,
    );
    async fn publish_early_fault(&self, site: &str, asset: &str, point: &str, evidence: &FaultEvidence);
    async fn publish_l2(&self, site: &str, asset: &str, point: &str, payload: &serde_json::Value);
    async fn publish_heartbeat(&self, snapshot: &HeartbeatSnapshot);
}

/// One recorded publish, kept for test assertions.
#[derive(Debug, Clone)]
pub enum Published {
    L1 { site: String, asset: String, point: String, features: FeatureVector },
    Health { site: String, asset: String, point: String, event: HealthEvent },
    Recommendation { site: String, asset: String, point: String, recommendation: Recommendation },
    EarlyFault { site: String, asset: String, point: String, evidence: FaultEvidence },
    L2 { site: String, asset: String, point: String, payload: serde_json::Value },
    Heartbeat { snapshot: HeartbeatSnapshot },
}

/// `[ADDED]` In-memory egress sink (C19): records every publish, usable in
/// tests and the demo binary. Not a production transport — §7's
/// `EgressFailure` ("log and continue") is the real implementation's
/// concern, not this one's.
#[derive(Default)]
pub struct InMemoryEgress {
    published: Mutex<Vec<Published>>,
}

impl InMemoryEgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Published> {
        std::mem::take(&mut self.published.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EgressPort for InMemoryEgress {
    async fn publish_l1(&self, site: &str, asset: &str, point: &str, features: &FeatureVector) {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published::L1 {
                site: site.to_string(),
                asset: asset.to_string(),
                point: point.to_string(),
                features: *features,
            });
    }

    async fn publish_health(&self, site: &str, asset: &str, point: &str, health: &HealthEvent) {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published::Health {
                site: site.to_string(),
                asset: asset.to_string(),
                point: point.to_string(),
                event: health.clone(),
            });
    }

    async fn publish_recommendation(
        &self,
        site: &str,
        asset: &str,
        point: &str,
        recommendation: &Recommendation,
    ) {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published::Recommendation {
                site: site.to_string(),
                asset: asset.to_string(),
                point: point.to_string(),
                recommendation: recommendation.clone(),
            });
    }

    async fn publish_early_fault(&self, site: &str, asset: &str, point: &str, evidence: &FaultEvidence) {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published::EarlyFault {
                site: site.to_string(),
                asset: asset.to_string(),
                point: point.to_string(),
                evidence: evidence.clone(),
            });
    }

    async fn publish_l2(&self, site: &str, asset: &str, point: &str, payload: &serde_json::Value) {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published::L2 {
                site: site.to_string(),
                asset: asset.to_string(),
                point: point.to_string(),
                payload: payload.clone(),
            });
    }

    async fn publish_heartbeat(&self, snapshot: &HeartbeatSnapshot) {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published::Heartbeat {
                snapshot: snapshot.clone(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_every_publish_kind() {
        let sink = InMemoryEgress::new();
        sink.publish_l1("s", "a", "p", &FeatureVector::zero(0.0)).await;
        assert_eq!(sink.len(), 1);
        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert!(sink.is_empty());
    }
}
