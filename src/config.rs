//! Configuration management for Turnstile.
//!
//! Algorithm parameters are fixed at startup and validated eagerly; a bad
//! limit or window is a configuration error, never a per-request one.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TurnstileError};

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission control configuration
    #[serde(default)]
    pub admission: AdmissionConfig,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            admission: AdmissionConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    "127.0.0.1:8081".parse().unwrap()
}

/// Admission control configuration: one parameter set per algorithm plus
/// the expiry sweep schedule shared by all three stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default)]
    pub fixed_window: FixedWindowConfig,

    #[serde(default)]
    pub sliding_window: SlidingWindowConfig,

    #[serde(default)]
    pub token_bucket: TokenBucketConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Fixed window algorithm parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedWindowConfig {
    /// Maximum requests allowed per window
    #[serde(default = "default_fixed_window_limit")]
    pub limit: u32,

    /// Window duration in seconds
    #[serde(default = "default_fixed_window_secs")]
    pub window_secs: u64,
}

impl Default for FixedWindowConfig {
    fn default() -> Self {
        Self {
            limit: default_fixed_window_limit(),
            window_secs: default_fixed_window_secs(),
        }
    }
}

impl FixedWindowConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_fixed_window_limit() -> u32 {
    3
}

fn default_fixed_window_secs() -> u64 {
    1
}

/// Sliding window algorithm parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlidingWindowConfig {
    /// Maximum requests allowed in the trailing window
    #[serde(default = "default_sliding_window_limit")]
    pub limit: u32,

    /// Window duration in seconds
    #[serde(default = "default_sliding_window_secs")]
    pub window_secs: u64,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            limit: default_sliding_window_limit(),
            window_secs: default_sliding_window_secs(),
        }
    }
}

impl SlidingWindowConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_sliding_window_limit() -> u32 {
    5
}

fn default_sliding_window_secs() -> u64 {
    30
}

/// Token bucket algorithm parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Tokens added per second
    #[serde(default = "default_refill_per_sec")]
    pub refill_per_sec: f64,

    /// Bucket capacity (maximum burst)
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            refill_per_sec: default_refill_per_sec(),
            burst: default_burst(),
        }
    }
}

fn default_refill_per_sec() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    3
}

/// Expiry sweep schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// How often the sweepers run, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// How long a client may stay idle before its record is evicted, in seconds
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            idle_secs: default_idle_secs(),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn idle_after(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_idle_secs() -> u64 {
    60
}

impl AdmissionConfig {
    /// Reject invalid algorithm parameters before any limiter is built.
    pub fn validate(&self) -> Result<()> {
        if self.fixed_window.limit == 0 {
            return Err(TurnstileError::Config(
                "fixed_window.limit must be at least 1".to_string(),
            ));
        }
        if self.fixed_window.window_secs == 0 {
            return Err(TurnstileError::Config(
                "fixed_window.window_secs must be at least 1".to_string(),
            ));
        }
        if self.sliding_window.limit == 0 {
            return Err(TurnstileError::Config(
                "sliding_window.limit must be at least 1".to_string(),
            ));
        }
        if self.sliding_window.window_secs == 0 {
            return Err(TurnstileError::Config(
                "sliding_window.window_secs must be at least 1".to_string(),
            ));
        }
        if !self.token_bucket.refill_per_sec.is_finite() || self.token_bucket.refill_per_sec <= 0.0 {
            return Err(TurnstileError::Config(
                "token_bucket.refill_per_sec must be a positive number".to_string(),
            ));
        }
        if self.token_bucket.burst == 0 {
            return Err(TurnstileError::Config(
                "token_bucket.burst must be at least 1".to_string(),
            ));
        }
        if self.sweep.interval_secs == 0 {
            return Err(TurnstileError::Config(
                "sweep.interval_secs must be at least 1".to_string(),
            ));
        }
        if self.sweep.idle_secs == 0 {
            return Err(TurnstileError::Config(
                "sweep.idle_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl TurnstileConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TurnstileConfig = serde_yaml::from_str(&contents)
            .map_err(|e| TurnstileError::Config(e.to_string()))?;
        Ok(config)
    }
}
