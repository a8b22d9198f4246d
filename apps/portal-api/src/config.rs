//! # Portal Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     LGU_PORT=8080  LGU_ENVIRONMENT=production                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, else the platform config dir:                     │
//! │     ~/.config/lgu-portal/portal.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/lgu/portal.db"
//! max_connections = 5
//!
//! [environment]
//! mode = "development"   # development | production
//! expose_test_otp = true
//!
//! [otp]
//! ttl_minutes = 5
//! max_attempts = 3
//!
//! [tax]
//! reject_missing_rate = false
//! monthly_penalty_bps = 200
//! max_penalty_bps = 7200
//! annual_discount_bps = 1000
//!
//! [reconcile]
//! enabled = true
//! interval_secs = 60
//! batch_size = 50
//! max_sync_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use lgu_core::ledger::{
    PenaltyPolicy, DEFAULT_ANNUAL_DISCOUNT_BPS, DEFAULT_MAX_PENALTY_BPS,
    DEFAULT_MONTHLY_PENALTY_BPS,
};
use lgu_core::otp::{OtpPolicy, DEFAULT_MAX_OTP_ATTEMPTS, DEFAULT_OTP_TTL_MINUTES};

/// Longest OTP lifetime accepted: one day.
pub const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("expose_test_otp must be false in production")]
    TestOtpInProduction,
}

// =============================================================================
// Sections
// =============================================================================

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for EnvironmentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(EnvironmentMode::Development),
            "production" | "prod" => Ok(EnvironmentMode::Production),
            _ => Err(ConfigError::InvalidValue("LGU_ENVIRONMENT".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./portal.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    #[serde(default)]
    pub mode: EnvironmentMode,

    /// Echo generated OTPs in responses. Development only.
    #[serde(default)]
    pub expose_test_otp: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSettings {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_OTP_TTL_MINUTES
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_OTP_ATTEMPTS
}

impl Default for OtpSettings {
    fn default() -> Self {
        OtpSettings {
            ttl_minutes: default_ttl_minutes(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Fail a computation when no rate row applies instead of using 0%.
    #[serde(default)]
    pub reject_missing_rate: bool,

    #[serde(default = "default_monthly_penalty_bps")]
    pub monthly_penalty_bps: u32,

    #[serde(default = "default_max_penalty_bps")]
    pub max_penalty_bps: u32,

    #[serde(default = "default_annual_discount_bps")]
    pub annual_discount_bps: u32,
}

fn default_monthly_penalty_bps() -> u32 {
    DEFAULT_MONTHLY_PENALTY_BPS
}

fn default_max_penalty_bps() -> u32 {
    DEFAULT_MAX_PENALTY_BPS
}

fn default_annual_discount_bps() -> u32 {
    DEFAULT_ANNUAL_DISCOUNT_BPS
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            reject_missing_rate: false,
            monthly_penalty_bps: default_monthly_penalty_bps(),
            max_penalty_bps: default_max_penalty_bps(),
            annual_discount_bps: default_annual_discount_bps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between worker ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Failed payments retried per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Failed syncs after which a payment leaves the retry queue.
    #[serde(default = "default_max_sync_attempts")]
    pub max_sync_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> u32 {
    50
}

fn default_max_sync_attempts() -> u32 {
    10
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        ReconcileSettings {
            enabled: true,
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            max_sync_attempts: default_max_sync_attempts(),
        }
    }
}

// =============================================================================
// PortalConfig
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub environment: EnvironmentSettings,

    #[serde(default)]
    pub otp: OtpSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

impl PortalConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `portal.toml` in the config dir)
    /// 3. `LGU_*` environment variables
    ///
    /// An explicit `config_path` must exist; the default location may not.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading portal config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.mode == EnvironmentMode::Production
            && self.environment.expose_test_otp
        {
            return Err(ConfigError::TestOtpInProduction);
        }

        if !(1..=MAX_OTP_TTL_MINUTES).contains(&self.otp.ttl_minutes) {
            return Err(ConfigError::InvalidValue("otp.ttl_minutes".into()));
        }

        if self.otp.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("otp.max_attempts".into()));
        }

        if self.tax.max_penalty_bps > 10_000 || self.tax.annual_discount_bps > 10_000 {
            return Err(ConfigError::InvalidValue("tax".into()));
        }

        if self.reconcile.interval_secs == 0
            || self.reconcile.batch_size == 0
            || self.reconcile.max_sync_attempts == 0
        {
            return Err(ConfigError::InvalidValue("reconcile".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = std::env::var("LGU_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Ok(port) = std::env::var("LGU_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LGU_PORT".into()))?;
        }

        if let Ok(path) = std::env::var("LGU_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(mode) = std::env::var("LGU_ENVIRONMENT") {
            self.environment.mode = mode.parse()?;
        }

        if let Ok(expose) = std::env::var("LGU_EXPOSE_TEST_OTP") {
            self.environment.expose_test_otp = matches!(
                expose.trim().to_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        if let Ok(ttl) = std::env::var("LGU_OTP_TTL_MINUTES") {
            self.otp.ttl_minutes = ttl
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LGU_OTP_TTL_MINUTES".into()))?;
        }

        if let Ok(reject) = std::env::var("LGU_REJECT_MISSING_RATE") {
            self.tax.reject_missing_rate = matches!(
                reject.trim().to_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        if let Ok(enabled) = std::env::var("LGU_RECONCILE_ENABLED") {
            match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.reconcile.enabled = true,
                "0" | "false" | "no" => self.reconcile.enabled = false,
                _ => warn!(value = %enabled, "Unknown LGU_RECONCILE_ENABLED value"),
            }
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ph", "lgu", "lgu-portal")
            .map(|dirs| dirs.config_dir().join("portal.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy {
            ttl_minutes: self.otp.ttl_minutes,
            max_attempts: self.otp.max_attempts,
        }
    }

    pub fn penalty_policy(&self) -> PenaltyPolicy {
        PenaltyPolicy {
            monthly_rate_bps: self.tax.monthly_penalty_bps,
            max_penalty_bps: self.tax.max_penalty_bps,
        }
    }

    /// True when generated OTPs may be echoed back to the caller.
    pub fn exposes_test_otp(&self) -> bool {
        self.environment.mode == EnvironmentMode::Development && self.environment.expose_test_otp
    }

    pub fn is_production(&self) -> bool {
        self.environment.mode == EnvironmentMode::Production
    }
}
