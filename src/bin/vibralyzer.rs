//! Vibralyzer demo binary.
//!
//! Reads newline-delimited JSON sample packets from stdin — one JSON object
//! per line, each carrying its own `topic` field shaped like
//! `vibration/raw/<SITE>/<ASSET>/<POINT>` — runs them through the
//! orchestrator, and logs every egress publish. Intended for local
//! smoke-testing against a replayed or simulated signal, not as a
//! production ingress.
//!
//! ```bash
//! ./simulate_vibration | vibralyzer
//! ```

use clap::Parser;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use vibralyzer::config::{self, EngineConfig};
use vibralyzer::egress::{EgressPort, InMemoryEgress, Published};
use vibralyzer::recommendation::TableRecommendationPort;
use vibralyzer::Orchestrator;

#[derive(Parser, Debug)]
#[command(name = "vibralyzer", about = "Edge vibration analytics demo")]
struct CliArgs {
    /// Path to a TOML config file (overrides VIBE_CONFIG / ./vibe_config.toml).
    #[arg(long, env = "VIBE_CONFIG")]
    config: Option<String>,

    /// Skip config loading entirely and use the bundled demo defaults.
    #[arg(long)]
    demo_config: bool,

    /// Number of L2 diagnostic workers.
    #[arg(long, default_value = "2")]
    l2_workers: usize,
}

/// One line of stdin input: a raw ingress envelope.
#[derive(Debug, Deserialize)]
struct StdinEnvelope {
    topic: String,
    payload: serde_json::Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,vibralyzer=debug")),
        )
        .init();

    let args = CliArgs::parse();

    let cfg = if args.demo_config {
        EngineConfig::demo()
    } else if let Some(path) = args.config.as_deref() {
        EngineConfig::load_from(std::path::Path::new(path))?
    } else {
        EngineConfig::load()?
    };
    config::init(cfg);

    info!(window_size = config::get().raw.window_size, "starting vibralyzer");

    let sink = Arc::new(InMemoryEgress::new());
    let egress: Arc<dyn EgressPort> = sink.clone();
    let recommendation = Arc::new(TableRecommendationPort::default());
    let orchestrator = Orchestrator::new(config::get(), egress, recommendation, args.l2_workers);

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let envelope: StdinEnvelope = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(err) => {
                warn!(%err, "skipping unparseable stdin line");
                continue;
            }
        };
        orchestrator
            .ingest_raw(&envelope.topic, &envelope.payload.to_string())
            .await;

        for published in sink.drain() {
            log_published(&published);
        }
    }

    info!(
        received = orchestrator.ingress_stats().received(),
        dropped = orchestrator.ingress_stats().dropped(),
        "stdin closed, shutting down"
    );
    orchestrator.shutdown(Duration::from_secs(5)).await;
    Ok(())
}

fn log_published(event: &Published) {
    match event {
        Published::L1 { site, asset, point, features } => {
            info!(site, asset, point, ?features, "publish_l1");
        }
        Published::Health { site, asset, point, event } => {
            info!(site, asset, point, phi = event.point_health_index, state = %event.state, "publish_health");
        }
        Published::Recommendation { site, asset, point, recommendation } => {
            info!(site, asset, point, action = %recommendation.action_code, "publish_recommendation");
        }
        Published::EarlyFault { site, asset, point, evidence } => {
            info!(site, asset, point, state = %evidence.state, confidence = evidence.confidence, "publish_early_fault");
        }
        Published::L2 { site, asset, point, .. } => {
            info!(site, asset, point, "publish_l2");
        }
        Published::Heartbeat { snapshot } => {
            info!(service = %snapshot.service, "publish_heartbeat");
        }
    }
}
