//! Built-in default constants.
//!
//! These are the values the system ships with when a key is present in the
//! TOML file but the operator wants the stock behavior; they are also used
//! by [`super::EngineConfig::demo`] for tests and the bundled demo binary.
//! They are NOT used to silently fill in a *missing* required key — see
//! `EngineConfig::load`.

/// PHI severity weights and normalization constants (§4.7).
pub const PHI_VEL_NORM_MM_S: f64 = 7.1;
pub const PHI_ENV_NORM_G: f64 = 0.35;
pub const PHI_CREST_NORM: f64 = 6.0;
pub const PHI_WEIGHT_VEL: f64 = 0.5;
pub const PHI_WEIGHT_ENV: f64 = 0.3;
pub const PHI_WEIGHT_CREST: f64 = 0.2;

/// State map boundaries (§4.7), closed on the upper side.
pub const PHI_NORMAL_MIN: f64 = 90.0;
pub const PHI_WATCH_MIN: f64 = 75.0;
pub const PHI_WARNING_MIN: f64 = 55.0;

/// Default trend-detector baseline-ratio thresholds (§9 open question),
/// used when configuration supplies none.
pub const TREND_WATCH_RATIO: f64 = 1.3;
pub const TREND_WARNING_RATIO: f64 = 1.6;
pub const TREND_ALARM_RATIO: f64 = 2.0;

/// Band-pass ranges used by the L1 feature pipeline (Hz), §4.2.
pub const HF_BAND: (f64, f64) = (3000.0, 10_000.0);
pub const LOW_ENERGY_BAND: (f64, f64) = (10.0, 100.0);
pub const HIGH_ENERGY_BAND: (f64, f64) = (1000.0, 5000.0);

/// g → m/s^2.
pub const GRAVITY: f64 = 9.806_65;

/// How long a worker is allowed to wait for a job before polling shutdown (§4.8).
pub const QUEUE_POLL_MS: u64 = 1000;
