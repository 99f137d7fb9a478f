//! Error taxonomy for the vibration analytics pipeline.
//!
//! Only `ConfigError` is fatal. Every other variant is logged and counted —
//! the pipeline is edge-tolerant of malformed packets, missing topology, and
//! downstream outages (see spec §7).

use thiserror::Error;

/// Errors raised while loading and validating the process-wide configuration.
///
/// `EngineConfig::load` returning this is the only fatal condition in the
/// hot path; everything else is recoverable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("required config key missing: {0}")]
    MissingKey(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an ingress packet is dropped before it reaches the ring buffer.
///
/// Dropped packets are silent to the caller but counted via
/// [`crate::ingress::IngressStats`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("acceleration field missing or empty")]
    MissingAcceleration,

    #[error("non-finite sample in acceleration array")]
    NonFiniteSample,

    #[error("unrecognized topic shape: {0}")]
    UnrecognizedTopic(String),
}

/// Errors surfaced by the L2 diagnostic job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is shutting down")]
    ShuttingDown,

    #[error("worker function failed: {0}")]
    WorkerFailed(String),
}
