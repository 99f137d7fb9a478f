//! Edge analytics pipeline for industrial rotating-machinery vibration
//! monitoring: ring buffer → L1 feature extraction → adaptive baseline /
//! trend / persistence / early-fault FSM → PHI authority → bounded L2
//! diagnostic job queue, with a thin ingress/egress boundary so the
//! message-bus transport itself stays out of this crate.

pub mod asset_health;
pub mod baseline;
pub mod config;
pub mod cooldown;
pub mod domain;
pub mod egress;
pub mod errors;
pub mod fault;
pub mod features;
pub mod fsm;
pub mod heartbeat;
pub mod ingress;
pub mod orchestrator;
pub mod persistence;
pub mod phi;
pub mod queue;
pub mod recommendation;
pub mod ring_buffer;
pub mod signal;
pub mod trend;

pub use domain::{FaultType, PointKey, SamplePacket, Severity};
pub use errors::{ConfigError, IngestError, QueueError};
pub use orchestrator::Orchestrator;
