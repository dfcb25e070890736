//! Configuration management for Tripgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use crate::error::{Result, TripgateError};
use crate::ratelimit::Policy;

/// Prefix for environment overrides, e.g. `TRIPGATE__SERVER__HTTP_ADDR`.
const ENV_PREFIX: &str = "TRIPGATE";

/// Main configuration for the Tripgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Period length of the default policy in milliseconds
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,

    /// Requests per period of the default policy
    #[serde(default = "default_max_requests")]
    pub default_max_requests: u64,

    /// How often expired windows are swept, in seconds
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval_secs: u64,

    /// Path to the per-route rules file
    pub rules_path: Option<String>,

    /// Rules reload interval in seconds (0 disables reloading)
    #[serde(default)]
    pub rules_reload_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
            default_max_requests: default_max_requests(),
            reclaim_interval_secs: default_reclaim_interval(),
            rules_path: None,
            rules_reload_interval_secs: 0,
        }
    }
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_max_requests() -> u64 {
    10
}

fn default_reclaim_interval() -> u64 {
    60
}

impl RateLimitingConfig {
    /// The policy applied where no route rule matches.
    pub fn default_policy(&self) -> Policy {
        Policy::new(
            Duration::from_millis(self.default_interval_ms),
            self.default_max_requests,
        )
    }

    /// Interval between reclaim sweeps.
    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }

    /// Interval between rules reloads, if reloading is enabled.
    pub fn rules_reload_interval(&self) -> Option<Duration> {
        match (&self.rules_path, self.rules_reload_interval_secs) {
            (Some(_), secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional file layered under environment
    /// variables prefixed with `TRIPGATE__`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path, "Loading service configuration");
            builder = builder.add_source(config::File::with_name(path));
        }

        let config: ServiceConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting
            .default_policy()
            .validate()
            .map_err(|e| TripgateError::Config(format!("default policy: {}", e)))?;

        if self.rate_limiting.reclaim_interval_secs == 0 {
            return Err(TripgateError::Config(
                "reclaim_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
