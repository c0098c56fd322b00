//! Configuration module for costing-engine.

use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CostingConfig {
    pub common: core_config::Config,
    pub backend: BackendConfig,
    pub formulation: FormulationDefaults,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<Secret<String>>,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Factors applied to a formulation that does not carry its own.
#[derive(Debug, Clone, Copy)]
pub struct FormulationDefaults {
    pub rm_factor: Decimal,
    pub batch_size: Decimal,
}

impl Default for FormulationDefaults {
    fn default() -> Self {
        Self {
            rm_factor: Decimal::ONE,
            batch_size: Decimal::ONE,
        }
    }
}

impl CostingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            backend: BackendConfig {
                base_url: env::var("BACKEND_URL")
                    .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
                api_token: env::var("BACKEND_API_TOKEN").ok().map(Secret::new),
                timeout: Duration::from_secs(parse_var("BACKEND_TIMEOUT_SECS", 30u64)?),
            },
            formulation: FormulationDefaults {
                rm_factor: parse_var("FORMULATION_DEFAULT_RM_FACTOR", Decimal::ONE)?,
                batch_size: parse_var("FORMULATION_DEFAULT_BATCH_SIZE", Decimal::ONE)?,
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} is not valid: {}", name, e))
        }),
        Err(_) => Ok(default),
    }
}
