//! Environment-variable configuration, loaded once at process startup.
//!
//! Every key here corresponds to a knob the scheduler or probe runtime
//! otherwise would have hard-coded: whether adaptive scheduling runs at
//! all, which synthesis algorithm to use, the SLO and rate limit to
//! enforce, and the handful of named timeouts the runtime relies on.

use std::path::PathBuf;
use std::time::Duration;

use rasc_scheduler::{SynthesisConfig, SynthesisMode, TailExtension};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(String),

    #[error("invalid value for environment variable {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Full runtime configuration, loaded from the environment (optionally via
/// a `.env` file) with defaults matching the upstream system's own.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Master switch: when false, callers should skip adaptive scheduling
    /// entirely and poll at a fixed interval.
    pub enabled: bool,
    /// Use the V-optimal DP synthesizer instead of the recurrence-based one.
    pub use_vopt: bool,
    /// Force uniform polling at `worst_case_delta`, bypassing synthesis.
    pub use_uniform: bool,
    /// Worst-case detection window (`Qw`), in seconds.
    pub worst_case_delta: f64,
    /// Target detection-probability SLO, in `(0, 1]`.
    pub slo: f64,
    /// Optional path to a pinned JSON array of durations used in place of
    /// a live-accumulated sample history (for reproducible runs).
    pub fixed_history: Option<PathBuf>,
    /// Minimum gap enforced between consecutive polls, in seconds.
    pub rate_limit: Option<f64>,
    pub tail_extension: TailExtension,

    pub default_failure_timeout: Duration,
    pub max_schedule_time: Duration,
    pub rpc_timeout: Duration,
    pub drift_window_capacity: usize,
    pub drift_relative_threshold: f64,
}

impl AppConfig {
    /// Loads configuration from the process environment, reading a `.env`
    /// file first if one is present (ignored if absent).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            enabled: env_bool_or("RASC_ENABLED", true)?,
            use_vopt: env_bool_or("RASC_USE_VOPT", false)?,
            use_uniform: env_bool_or("RASC_USE_UNIFORM", false)?,
            worst_case_delta: env_f64_or("RASC_WORST_Q", 2.0)?,
            slo: env_f64_or("RASC_SLO", 0.95)?,
            fixed_history: env_var_opt("RASC_FIXED_HISTORY").map(PathBuf::from),
            rate_limit: env_f64_opt("RASC_RATE_LIMIT")?,
            tail_extension: env_tail_extension_or("RASC_TAIL_EXTENSION", TailExtension::FlatQw)?,

            default_failure_timeout: Duration::from_secs_f64(env_f64_or(
                "RASC_DEFAULT_FAILURE_TIMEOUT_SECS",
                1000.0,
            )?),
            max_schedule_time: Duration::from_secs_f64(env_f64_or("RASC_MAX_SCHEDULE_TIME_SECS", 0.5)?),
            rpc_timeout: Duration::from_secs_f64(env_f64_or("RASC_RPC_TIMEOUT_SECS", 5.0)?),
            drift_window_capacity: env_usize_or("RASC_DRIFT_WINDOW_CAPACITY", 10)?,
            drift_relative_threshold: env_f64_or("RASC_DRIFT_RELATIVE_THRESHOLD", 0.05)?,
        })
    }

    /// Builds the schedule-synthesis configuration implied by this config:
    /// V-optimal when `use_vopt` is set, recurrence-based otherwise, with
    /// `use_uniform` left for the caller to check separately since it
    /// bypasses synthesis entirely rather than selecting a mode within it.
    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            mode: if self.use_vopt { SynthesisMode::VOptimal } else { SynthesisMode::Recurrence },
            slo: self.slo,
            worst_case_delta: self.worst_case_delta,
            rate_limit: self.rate_limit,
            tail_extension: self.tail_extension,
        }
    }
}

fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool_or(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env_var_opt(key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: v }),
        },
    }
}

fn env_f64_or(key: &str, default: f64) -> Result<f64, ConfigError> {
    match env_var_opt(key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: v }),
    }
}

fn env_f64_opt(key: &str) -> Result<Option<f64>, ConfigError> {
    match env_var_opt(key) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: v }),
    }
}

fn env_usize_or(key: &str, default: usize) -> Result<usize, ConfigError> {
    match env_var_opt(key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: v }),
    }
}

fn env_tail_extension_or(key: &str, default: TailExtension) -> Result<TailExtension, ConfigError> {
    match env_var_opt(key) {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "flat_qw" | "flat" => Ok(TailExtension::FlatQw),
            "exponential_capped" | "exponential" => Ok(TailExtension::ExponentialCapped),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: v }),
        },
    }
}
