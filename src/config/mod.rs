//! Process-wide configuration.
//!
//! Loaded once at startup from a TOML file, stored in a `OnceLock`, and read
//! from anywhere in the pipeline via [`get`]. There is no other
//! module-scoped mutable state in this system (§9 Design Notes): the
//! config-file cache idiom some analytics stacks use has no place here.
//!
//! ## Loading order
//!
//! 1. `VIBE_CONFIG` environment variable (path to a TOML file)
//! 2. `./vibe_config.toml` in the current working directory
//! 3. Built-in defaults (`EngineConfig::demo`), for tests and the demo binary
//!
//! Every key listed in spec §6 is *required* when a config file is loaded —
//! `EngineConfig::load` fails fast with [`ConfigError::MissingKey`] rather
//! than silently substituting a default, per §7 (`ConfigMissing` is the only
//! fatal error in this system).

pub mod defaults;

use crate::errors::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

/// Drop policy applied when the L2 job queue is at capacity (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    DropNew,
    DropOldest,
}

#[derive(Debug, Clone)]
pub struct RawConfig {
    pub window_size: usize,
}

#[derive(Debug, Clone)]
pub struct L1FeatureConfig {
    pub sampling_rate: f64,
    pub rpm_default: f64,
}

#[derive(Debug, Clone)]
pub struct BaselineConfig {
    pub alpha: f64,
    pub min_samples: u64,
}

/// Per-feature baseline-ratio thresholds for the trend detector (§9).
#[derive(Debug, Clone)]
pub struct TrendThresholds {
    pub watch_ratio: f64,
    pub warning_ratio: f64,
    pub alarm_ratio: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            watch_ratio: defaults::TREND_WATCH_RATIO,
            warning_ratio: defaults::TREND_WARNING_RATIO,
            alarm_ratio: defaults::TREND_ALARM_RATIO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EarlyFaultConfig {
    pub watch_persistence: i64,
    pub warning_persistence: i64,
    pub alarm_persistence: i64,
    pub hysteresis_clear: i64,
    pub trend_thresholds: TrendThresholds,
}

#[derive(Debug, Clone)]
pub struct CircuitConfig {
    pub fail_threshold: u32,
    pub reset_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct L2Config {
    pub enable: bool,
    pub cooldown_warning_sec: u64,
    pub cooldown_alarm_sec: u64,
    pub queue_capacity: usize,
    pub worker_count: usize,
    pub max_retries: u32,
    pub circuit: CircuitConfig,
    pub drop_policy: DropPolicy,
}

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub interval_sec: u64,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub raw_topic: String,
}

/// PHI severity weights and the state-map boundaries (§4.7). Configurable,
/// defaults to the ISO-derived values in the spec.
#[derive(Debug, Clone)]
pub struct PhiConfig {
    pub vel_norm_mm_s: f64,
    pub env_norm_g: f64,
    pub crest_norm: f64,
    pub weight_vel: f64,
    pub weight_env: f64,
    pub weight_crest: f64,
    pub normal_min: f64,
    pub watch_min: f64,
    pub warning_min: f64,
}

impl Default for PhiConfig {
    fn default() -> Self {
        Self {
            vel_norm_mm_s: defaults::PHI_VEL_NORM_MM_S,
            env_norm_g: defaults::PHI_ENV_NORM_G,
            crest_norm: defaults::PHI_CREST_NORM,
            weight_vel: defaults::PHI_WEIGHT_VEL,
            weight_env: defaults::PHI_WEIGHT_ENV,
            weight_crest: defaults::PHI_WEIGHT_CREST,
            normal_min: defaults::PHI_NORMAL_MIN,
            watch_min: defaults::PHI_WATCH_MIN,
            warning_min: defaults::PHI_WARNING_MIN,
        }
    }
}

/// The process-wide immutable configuration record (§9 Design Notes).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub raw: RawConfig,
    pub l1_feature: L1FeatureConfig,
    pub baseline: BaselineConfig,
    pub early_fault: EarlyFaultConfig,
    pub l2: L2Config,
    pub heartbeat: HeartbeatConfig,
    pub mqtt: MqttConfig,
    pub phi: PhiConfig,
}

/// Raw TOML shape. Every field is optional here so that a present-but-empty
/// section can still be distinguished from an absent one; required-key
/// enforcement happens explicitly in `EngineConfig::load`.
#[derive(Debug, Default, Deserialize)]
struct RawToml {
    raw: Option<RawTomlRaw>,
    l1_feature: Option<L1FeatureToml>,
    baseline: Option<BaselineToml>,
    early_fault: Option<EarlyFaultToml>,
    l2: Option<L2Toml>,
    heartbeat: Option<HeartbeatToml>,
    mqtt: Option<MqttToml>,
}

#[derive(Debug, Deserialize)]
struct RawTomlRaw {
    window_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct L1FeatureToml {
    sampling_rate: Option<f64>,
    rpm_default: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BaselineToml {
    alpha: Option<f64>,
    min_samples: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EarlyFaultToml {
    watch_persistence: Option<i64>,
    warning_persistence: Option<i64>,
    alarm_persistence: Option<i64>,
    hysteresis_clear: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CircuitToml {
    fail_threshold: Option<u32>,
    reset_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct L2Toml {
    enable: Option<bool>,
    cooldown_warning_sec: Option<u64>,
    cooldown_alarm_sec: Option<u64>,
    queue_capacity: Option<usize>,
    worker_count: Option<usize>,
    max_retries: Option<u32>,
    circuit: Option<CircuitToml>,
    drop_policy: Option<DropPolicy>,
}

#[derive(Debug, Deserialize)]
struct HeartbeatToml {
    interval_sec: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    broker: Option<String>,
    port: Option<u16>,
    raw_topic: Option<String>,
}

macro_rules! required {
    ($section:expr, $field:ident, $key:expr) => {
        $section
            .as_ref()
            .and_then(|s| s.$field)
            .ok_or(ConfigError::MissingKey($key))?
    };
}

macro_rules! required_clone {
    ($section:expr, $field:ident, $key:expr) => {
        $section
            .as_ref()
            .and_then(|s| s.$field.clone())
            .ok_or(ConfigError::MissingKey($key))?
    };
}

impl EngineConfig {
    /// Parse and validate a TOML config string. Every required key from
    /// spec §6 must be present or this returns `ConfigError::MissingKey`.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawToml = toml::from_str(contents)?;

        let window_size = required!(raw.raw, window_size, "raw.window_size");
        if window_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "raw.window_size",
                reason: "must be > 0".into(),
            });
        }

        let sampling_rate = required!(raw.l1_feature, sampling_rate, "l1_feature.sampling_rate");
        let rpm_default = required!(raw.l1_feature, rpm_default, "l1_feature.rpm_default");
        if sampling_rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "l1_feature.sampling_rate",
                reason: "must be > 0".into(),
            });
        }

        let alpha = required!(raw.baseline, alpha, "baseline.alpha");
        let min_samples = required!(raw.baseline, min_samples, "baseline.min_samples");
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ConfigError::InvalidValue {
                key: "baseline.alpha",
                reason: "must be in [0,1]".into(),
            });
        }

        let watch_persistence =
            required!(raw.early_fault, watch_persistence, "early_fault.watch_persistence");
        let warning_persistence = required!(
            raw.early_fault,
            warning_persistence,
            "early_fault.warning_persistence"
        );
        let alarm_persistence =
            required!(raw.early_fault, alarm_persistence, "early_fault.alarm_persistence");
        let hysteresis_clear =
            required!(raw.early_fault, hysteresis_clear, "early_fault.hysteresis_clear");

        let l2_section = raw.l2.as_ref().ok_or(ConfigError::MissingKey("l2.enable"))?;
        let enable = l2_section.enable.ok_or(ConfigError::MissingKey("l2.enable"))?;
        let cooldown_warning_sec = l2_section
            .cooldown_warning_sec
            .ok_or(ConfigError::MissingKey("l2.cooldown_warning_sec"))?;
        let cooldown_alarm_sec = l2_section
            .cooldown_alarm_sec
            .ok_or(ConfigError::MissingKey("l2.cooldown_alarm_sec"))?;
        let queue_capacity = l2_section
            .queue_capacity
            .ok_or(ConfigError::MissingKey("l2.queue_capacity"))?;
        let worker_count = l2_section
            .worker_count
            .ok_or(ConfigError::MissingKey("l2.worker_count"))?;
        let max_retries = l2_section
            .max_retries
            .ok_or(ConfigError::MissingKey("l2.max_retries"))?;
        let drop_policy = l2_section
            .drop_policy
            .ok_or(ConfigError::MissingKey("l2.drop_policy"))?;
        let fail_threshold = l2_section
            .circuit
            .as_ref()
            .and_then(|c| c.fail_threshold)
            .ok_or(ConfigError::MissingKey("l2.circuit.fail_threshold"))?;
        let reset_seconds = l2_section
            .circuit
            .as_ref()
            .and_then(|c| c.reset_seconds)
            .ok_or(ConfigError::MissingKey("l2.circuit.reset_seconds"))?;
        if worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "l2.worker_count",
                reason: "must be > 0".into(),
            });
        }

        let interval_sec = required!(raw.heartbeat, interval_sec, "heartbeat.interval_sec");

        let broker = required_clone!(raw.mqtt, broker, "mqtt.broker");
        let port = required!(raw.mqtt, port, "mqtt.port");
        let raw_topic = required_clone!(raw.mqtt, raw_topic, "mqtt.raw_topic");

        Ok(EngineConfig {
            raw: RawConfig { window_size },
            l1_feature: L1FeatureConfig {
                sampling_rate,
                rpm_default,
            },
            baseline: BaselineConfig { alpha, min_samples },
            early_fault: EarlyFaultConfig {
                watch_persistence,
                warning_persistence,
                alarm_persistence,
                hysteresis_clear,
                trend_thresholds: TrendThresholds::default(),
            },
            l2: L2Config {
                enable,
                cooldown_warning_sec,
                cooldown_alarm_sec,
                queue_capacity,
                worker_count,
                max_retries,
                circuit: CircuitConfig {
                    fail_threshold,
                    reset_seconds,
                },
                drop_policy,
            },
            heartbeat: HeartbeatConfig { interval_sec },
            mqtt: MqttConfig {
                broker,
                port,
                raw_topic,
            },
            phi: PhiConfig::default(),
        })
    }

    /// Load from `VIBE_CONFIG`, then `./vibe_config.toml`. Fails fast
    /// (`ConfigError`) if neither is readable/valid — there is no silent
    /// fallback to defaults for a real deployment (§7: `ConfigMissing` is
    /// fatal at startup).
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("VIBE_CONFIG").unwrap_or_else(|_| "vibe_config.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// A complete, self-consistent config matching the defaults quoted in
    /// spec §6/§4.7. Used by tests and the demo binary — never a substitute
    /// for a real file in production (see module docs).
    pub fn demo() -> Self {
        EngineConfig {
            raw: RawConfig { window_size: 4096 },
            l1_feature: L1FeatureConfig {
                sampling_rate: 25_600.0,
                rpm_default: 1800.0,
            },
            baseline: BaselineConfig {
                alpha: 0.1,
                min_samples: 20,
            },
            early_fault: EarlyFaultConfig {
                watch_persistence: 3,
                warning_persistence: 6,
                alarm_persistence: 10,
                hysteresis_clear: 4,
                trend_thresholds: TrendThresholds::default(),
            },
            l2: L2Config {
                enable: true,
                cooldown_warning_sec: 30,
                cooldown_alarm_sec: 15,
                queue_capacity: 256,
                worker_count: 4,
                max_retries: 2,
                circuit: CircuitConfig {
                    fail_threshold: 5,
                    reset_seconds: 60,
                },
                drop_policy: DropPolicy::DropOldest,
            },
            heartbeat: HeartbeatConfig { interval_sec: 10 },
            mqtt: MqttConfig {
                broker: "localhost".into(),
                port: 1883,
                raw_topic: "vibration/raw".into(),
            },
            phi: PhiConfig::default(),
        }
    }
}

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global configuration. Must be called exactly once before
/// any call to [`get`].
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called: a missing config is a fatal
/// startup error (§7), not a recoverable one.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
