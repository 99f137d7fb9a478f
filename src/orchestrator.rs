//! Orchestrator (C11): wires one raw sample packet through
//! C2 → C3 → (C5 → C4 gated → C6 → C7) and C8 → C9, then emits egress
//! (§4.10). The only module that touches every other module in the crate.

use crate::baseline::BaselineStore;
use crate::config::{EngineConfig, PhiConfig};
use crate::cooldown::CooldownTracker;
use crate::domain::{PointKey, SamplePacket, Severity, FEATURE_KEYS};
use crate::egress::{EgressPort, HealthEvent};
use crate::fault::{self, FaultRuleThresholds};
use crate::features;
use crate::fsm::EarlyFaultFsm;
use crate::heartbeat::HeartbeatTracker;
use crate::ingress::{self, IngressStats};
use crate::persistence::PersistenceStore;
use crate::queue::{L2Job, L2Queue, L2WorkerFn};
use crate::recommendation::RecommendationPort;
use crate::ring_buffer::RingBufferRegistry;
use crate::trend::TrendDetector;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fan-out width for the per-key worker pool (§5: "hash key → pool slot").
/// Not config-driven — it only needs to be large enough that unrelated
/// keys rarely collide; correctness does not depend on its exact value.
const INGRESS_WORKER_COUNT: usize = 8;
const INGRESS_CHANNEL_DEPTH: usize = 1024;

/// Everything a single ingress worker needs to run §4.10 steps 1–9 for one
/// key. Held behind a shared `Arc` so every worker task can reach it
/// without the orchestrator itself needing to be self-referential.
struct Core {
    ring: RingBufferRegistry,
    baseline: BaselineStore,
    trend: TrendDetector,
    persistence: PersistenceStore,
    fsm: EarlyFaultFsm,
    cooldown: CooldownTracker,
    heartbeat: HeartbeatTracker,
    egress: Arc<dyn EgressPort>,
    recommendation: Arc<dyn RecommendationPort>,
    fault_thresholds: FaultRuleThresholds,
    phi_cfg: PhiConfig,
    sampling_rate: f64,
    heartbeat_interval: Duration,
    last_heartbeat_secs: AtomicI64,
    queue: L2Queue,
    l2_enabled: bool,
}

impl Core {
    /// Steps 1–9 of §4.10. Per-key serialization is guaranteed by routing
    /// (hashing the key to one single-threaded worker, §5), not by a lock
    /// here.
    async fn process_one(&self, packet: SamplePacket) {
        let key = packet.key();

        self.heartbeat.mark("raw_rx");
        self.ring.append(&packet);
        if !self.ring.ready(&key) {
            return;
        }

        let Some(window) = self.ring.snapshot(&key) else {
            return;
        };
        self.heartbeat.mark("window_ready");

        let features = features::compute_features(&window, self.sampling_rate);
        self.heartbeat.mark("l1_exec");
        self.egress.publish_l1(&key.site, &key.asset, &key.point, &features).await;

        let trend = self.trend.evaluate(&self.baseline, &key, &features);
        let allow_update = trend.level == Severity::Normal;
        let mut values: HashMap<&'static str, f64> = HashMap::with_capacity(FEATURE_KEYS.len());
        for &feature in FEATURE_KEYS.iter() {
            if let Some(v) = features.get(feature) {
                values.insert(feature, v);
            }
        }
        self.baseline.update(&key, &values, allow_update);
        let sustained = self.persistence.update(&key, trend.level);
        let counter = self.persistence.counter(&key);
        let evidence = self.fsm.update(&trend, sustained, counter, features.timestamp);

        let phi = crate::phi::compute_phi(&features, &self.phi_cfg);
        let state = crate::phi::phi_to_state(phi, &self.phi_cfg);
        let fault_type = fault::diagnose(&features, state, &self.fault_thresholds);

        let health_event = HealthEvent {
            point_health_index: phi,
            state,
            fsm_state: evidence.state,
            fault_type: if state == Severity::Normal { None } else { Some(fault_type) },
            confidence: evidence.confidence,
            timestamp: features.timestamp,
        };
        self.egress
            .publish_health(&key.site, &key.asset, &key.point, &health_event)
            .await;
        self.egress
            .publish_early_fault(&key.site, &key.asset, &key.point, &evidence)
            .await;

        if self.l2_enabled && matches!(state, Severity::Warning | Severity::Alarm) {
            let now = Instant::now();
            if self.cooldown.can_trigger(&key, state, now) {
                self.cooldown.mark_triggered(&key, state, now);
                let job = L2Job {
                    site: key.site.clone(),
                    asset: key.asset.clone(),
                    point: key.point.clone(),
                    features,
                    fault_evidence: evidence.clone(),
                    health_event: health_event.clone(),
                    fault_type,
                    publisher: Arc::downgrade(&self.egress),
                    retries: 0,
                };
                self.queue.enqueue(job);
            }
        }

        let recommendation =
            self.recommendation
                .recommend(state, fault_type, Some(evidence.confidence), Some(phi), "en");
        self.egress
            .publish_recommendation(&key.site, &key.asset, &key.point, &recommendation)
            .await;

        let now_secs = features.timestamp as i64;
        let last = self.last_heartbeat_secs.load(Ordering::Relaxed);
        if (now_secs - last) as f64 >= self.heartbeat_interval.as_secs_f64() {
            self.last_heartbeat_secs.store(now_secs, Ordering::Relaxed);
            self.egress.publish_heartbeat(&self.heartbeat.snapshot()).await;
        }
    }
}

fn worker_index(key: &PointKey) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % INGRESS_WORKER_COUNT
}

fn l2_worker_fn() -> L2WorkerFn {
    Arc::new(|job: L2Job| {
        Box::pin(async move {
            let Some(egress) = job.publisher.upgrade() else {
                return Err("egress sink has been dropped".to_string());
            };
            let payload = serde_json::json!({
                "site": job.site,
                "asset": job.asset,
                "point": job.point,
                "fault_type": job.fault_type,
                "fault_evidence": job.fault_evidence,
                "health_event": job.health_event,
                "retries": job.retries,
            });
            egress.publish_l2(&job.site, &job.asset, &job.point, &payload).await;
            Ok(())
        })
    })
}

/// The public entry point: owns the per-key ingress worker pool, the L2
/// queue's worker pool, and a handle to every shared store.
pub struct Orchestrator {
    core: Arc<Core>,
    senders: Vec<mpsc::Sender<SamplePacket>>,
    ingress_handles: Mutex<Vec<JoinHandle<()>>>,
    queue_handles: Mutex<Vec<JoinHandle<()>>>,
    ingress_stats: IngressStats,
}

impl Orchestrator {
    /// Build every store from `cfg`, then spawn the ingress worker pool
    /// and the L2 diagnostic worker pool. Must be called from within a
    /// running tokio runtime.
    pub fn new(
        cfg: &EngineConfig,
        egress: Arc<dyn EgressPort>,
        recommendation: Arc<dyn RecommendationPort>,
        l2_worker_count: usize,
    ) -> Self {
        let queue = L2Queue::new(
            cfg.l2.queue_capacity,
            cfg.l2.drop_policy,
            cfg.l2.max_retries,
            cfg.l2.circuit.fail_threshold,
            cfg.l2.circuit.reset_seconds,
        );

        let core = Arc::new(Core {
            ring: RingBufferRegistry::new(cfg.raw.window_size),
            baseline: BaselineStore::new(cfg.baseline.alpha, cfg.baseline.min_samples),
            trend: TrendDetector::new(cfg.early_fault.trend_thresholds.clone()),
            persistence: PersistenceStore::new(
                cfg.early_fault.watch_persistence,
                cfg.early_fault.warning_persistence,
                cfg.early_fault.alarm_persistence,
                cfg.early_fault.hysteresis_clear,
            ),
            fsm: EarlyFaultFsm::new(cfg.early_fault.alarm_persistence),
            cooldown: CooldownTracker::new(
                Duration::from_secs(cfg.l2.cooldown_warning_sec),
                Duration::from_secs(cfg.l2.cooldown_alarm_sec),
            ),
            heartbeat: HeartbeatTracker::new("vibralyzer"),
            egress,
            recommendation,
            fault_thresholds: FaultRuleThresholds::default(),
            phi_cfg: cfg.phi.clone(),
            sampling_rate: cfg.l1_feature.sampling_rate,
            heartbeat_interval: Duration::from_secs(cfg.heartbeat.interval_sec),
            last_heartbeat_secs: AtomicI64::new(0),
            queue,
            l2_enabled: cfg.l2.enable,
        });

        let mut senders = Vec::with_capacity(INGRESS_WORKER_COUNT);
        let mut ingress_handles = Vec::with_capacity(INGRESS_WORKER_COUNT);
        for _ in 0..INGRESS_WORKER_COUNT {
            let (tx, mut rx) = mpsc::channel::<SamplePacket>(INGRESS_CHANNEL_DEPTH);
            let core = Arc::clone(&core);
            ingress_handles.push(tokio::spawn(async move {
                while let Some(packet) = rx.recv().await {
                    core.process_one(packet).await;
                }
            }));
            senders.push(tx);
        }

        // §6: `l2.enable = false` must be a real off switch, not a no-op —
        // don't spawn diagnostic workers at all when disabled (step 7's
        // enqueue is separately gated in `Core::process_one`).
        let queue_handles = if cfg.l2.enable {
            core.queue.start(l2_worker_count.max(1), l2_worker_fn())
        } else {
            Vec::new()
        };

        Self {
            core,
            senders,
            ingress_handles: Mutex::new(ingress_handles),
            queue_handles: Mutex::new(queue_handles),
            ingress_stats: IngressStats::default(),
        }
    }

    /// Parse one raw `(topic, payload)` pair and route it to the correct
    /// per-key worker. Malformed input is dropped and counted (§7), never
    /// propagated.
    pub async fn ingest_raw(&self, topic: &str, payload_json: &str) {
        self.ingress_stats.record_received();
        match ingress::parse_sample_packet(topic, payload_json) {
            Ok(packet) => self.ingest(packet).await,
            Err(err) => {
                self.ingress_stats.record_dropped();
                tracing::warn!(topic, %err, "dropping malformed ingress packet");
            }
        }
    }

    /// Route an already-parsed packet to its key's worker.
    pub async fn ingest(&self, packet: SamplePacket) {
        if !packet.is_valid() {
            self.ingress_stats.record_dropped();
            tracing::warn!(site = %packet.site, asset = %packet.asset, point = %packet.point, "dropping invalid sample packet");
            return;
        }
        let idx = worker_index(&packet.key());
        if let Some(tx) = self.senders.get(idx) {
            if tx.send(packet).await.is_err() {
                self.ingress_stats.record_dropped();
            }
        }
    }

    pub fn ingress_stats(&self) -> &IngressStats {
        &self.ingress_stats
    }

    pub fn queue_metrics(&self) -> crate::queue::QueueMetricsSnapshot {
        self.core.queue.metrics()
    }

    /// Close ingress, drain the per-key pool, then stop the L2 queue
    /// (§5 Cancellation).
    pub async fn shutdown(self, timeout: Duration) {
        drop(self.senders); // closes every ingress channel; workers exit their recv loop
        let ingress_handles =
            std::mem::take(&mut *self.ingress_handles.lock().unwrap_or_else(|e| e.into_inner()));
        let deadline = tokio::time::Instant::now() + timeout;
        for handle in ingress_handles {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let _ = tokio::time::timeout(remaining, handle).await;
        }

        let queue_handles =
            std::mem::take(&mut *self.queue_handles.lock().unwrap_or_else(|e| e.into_inner()));
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        self.core.queue.stop(queue_handles, remaining).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::egress::InMemoryEgress;
    use crate::recommendation::TableRecommendationPort;

    fn sample(site: &str, asset: &str, point: &str, n: usize, amp: f64) -> SamplePacket {
        SamplePacket {
            site: site.into(),
            asset: asset.into(),
            point: point.into(),
            rpm: Some(1800.0),
            temperature: None,
            speed: None,
            timestamp: Some(0.0),
            acceleration: (0..n).map(|i| amp * (i as f64).sin()).collect(),
        }
    }

    #[tokio::test]
    async fn ingest_below_window_capacity_produces_no_egress() {
        let mut cfg = EngineConfig::demo();
        cfg.raw.window_size = 64;
        let sink = Arc::new(InMemoryEgress::new());
        let egress: Arc<dyn EgressPort> = sink.clone();
        let recommendation: Arc<dyn RecommendationPort> = Arc::new(TableRecommendationPort::default());
        let orchestrator = Orchestrator::new(&cfg, egress, recommendation, 1);

        orchestrator.ingest(sample("S", "A", "DE", 10, 0.01)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(sink.is_empty(), "a partial window must not trigger any publish");
    }

    #[tokio::test]
    async fn full_window_emits_l1_and_health() {
        let mut cfg = EngineConfig::demo();
        cfg.raw.window_size = 64;
        let sink = Arc::new(InMemoryEgress::new());
        let egress: Arc<dyn EgressPort> = sink.clone();
        let recommendation: Arc<dyn RecommendationPort> = Arc::new(TableRecommendationPort::default());
        let orchestrator = Orchestrator::new(&cfg, egress, recommendation, 1);

        orchestrator.ingest(sample("S", "A", "DE", 64, 0.01)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let published = sink.drain();
        assert!(published.iter().any(|p| matches!(p, crate::egress::Published::L1 { .. })));
        assert!(published.iter().any(|p| matches!(p, crate::egress::Published::Health { .. })));
        assert!(published
            .iter()
            .any(|p| matches!(p, crate::egress::Published::Recommendation { .. })));
    }

    /// §6: `l2.enable = false` must actually suppress the L2 track — no
    /// worker pool, no enqueue — even when the point is severe enough that
    /// an enabled pipeline would trigger one.
    #[tokio::test]
    async fn l2_disabled_never_enqueues_even_for_a_severe_point() {
        let mut cfg = EngineConfig::demo();
        cfg.l2.enable = false;
        let sink = Arc::new(InMemoryEgress::new());
        let egress: Arc<dyn EgressPort> = sink.clone();
        let recommendation: Arc<dyn RecommendationPort> = Arc::new(TableRecommendationPort::default());
        let orchestrator = Orchestrator::new(&cfg, egress, recommendation, 1);

        let fs = cfg.l1_feature.sampling_rate;
        let n = cfg.raw.window_size;
        let signal: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                0.2 * (2.0 * std::f64::consts::PI * 50.0 * t).sin()
                    + 0.3 * (2.0 * std::f64::consts::PI * 4000.0 * t).sin()
            })
            .collect();
        orchestrator.ingest(sample_with("S", "A", "DE", signal)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let published = sink.drain();
        assert!(
            published.iter().any(|p| matches!(
                p,
                crate::egress::Published::Health { event, .. }
                    if matches!(event.state, Severity::Warning | Severity::Alarm)
            )),
            "fixture signal should still reach a severe health state"
        );
        assert!(!published.iter().any(|p| matches!(p, crate::egress::Published::L2 { .. })));

        let metrics = orchestrator.queue_metrics();
        assert_eq!(metrics.jobs_processed, 0);
        assert_eq!(metrics.queue_size, 0);
    }

    fn sample_with(site: &str, asset: &str, point: &str, acceleration: Vec<f64>) -> SamplePacket {
        SamplePacket {
            site: site.into(),
            asset: asset.into(),
            point: point.into(),
            rpm: Some(1800.0),
            temperature: None,
            speed: None,
            timestamp: Some(0.0),
            acceleration,
        }
    }
}
