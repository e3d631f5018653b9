//! Application configuration.
//!
//! All runtime settings are resolved once at startup (`AppConfig::from_env`)
//! and passed into constructors explicitly. Nothing below the API layer
//! reads process environment on its own, so pipelines and clients stay
//! deterministic under test.

use std::net::{IpAddr, Ipv4Addr};

use crate::generation::GenerationConfig;
use crate::service::FallbackPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Vesti";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,vesti=debug"
}

/// Default HTTP port for the try-on API.
pub const DEFAULT_PORT: u16 = 5001;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REPLICATE_API_TOKEN is missing from the environment")]
    MissingApiToken,

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the API server binds to.
    pub bind_addr: IpAddr,
    /// Port the API server binds to (0 = ephemeral).
    pub port: u16,
    /// External generation endpoint settings.
    pub generation: GenerationConfig,
    /// What to do when preprocessing or generation fails.
    pub fallback_policy: FallbackPolicy,
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    ///
    /// `REPLICATE_API_TOKEN` is required: a missing token is a startup
    /// error, not a mid-request surprise. Everything else has defaults:
    /// `VESTI_BIND_ADDR`, `VESTI_PORT`, `VESTI_FALLBACK` (`strict` or
    /// `echo`), `REPLICATE_BASE_URL`, `VESTI_MODEL_VERSION`,
    /// `VESTI_GENERATION_DEADLINE_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("REPLICATE_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingApiToken)?;

        let bind_addr = match std::env::var("VESTI_BIND_ADDR") {
            Ok(raw) => raw.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                var: "VESTI_BIND_ADDR",
                value: raw,
            })?,
            Err(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match std::env::var("VESTI_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: "VESTI_PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let fallback_policy = match std::env::var("VESTI_FALLBACK") {
            Ok(raw) => raw
                .parse::<FallbackPolicy>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "VESTI_FALLBACK",
                    value: raw,
                })?,
            Err(_) => FallbackPolicy::Strict,
        };

        let mut generation = GenerationConfig::new(api_token);
        if let Ok(base_url) = std::env::var("REPLICATE_BASE_URL") {
            generation.base_url = base_url;
        }
        if let Ok(version) = std::env::var("VESTI_MODEL_VERSION") {
            generation.model_version = version;
        }
        if let Ok(raw) = std::env::var("VESTI_GENERATION_DEADLINE_SECS") {
            generation.deadline_secs =
                raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    var: "VESTI_GENERATION_DEADLINE_SECS",
                    value: raw,
                })?;
        }

        Ok(Self {
            bind_addr,
            port,
            generation,
            fallback_policy,
        })
    }
}
