use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_size: u32,
    pub session_ttl_hours: i64,
    pub page_size: i64,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

        let config = AppConfig {
            database_url,
            host: lookup("EMR_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "EMR_PORT", DEFAULT_PORT)?,
            pool_size: parse_or(&lookup, "EMR_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            session_ttl_hours: parse_or(&lookup, "EMR_SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?,
            page_size: parse_or(&lookup, "EMR_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        };

        if config.pool_size == 0 {
            return Err(anyhow!("EMR_POOL_SIZE must be at least 1"));
        }
        if config.session_ttl_hours <= 0 {
            return Err(anyhow!("EMR_SESSION_TTL_HOURS must be positive"));
        }
        if config.page_size <= 0 {
            return Err(anyhow!("EMR_PAGE_SIZE must be positive"));
        }
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/emr")]).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn database_url_is_required() {
        let err = config_from(&[("EMR_PORT", "9000")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/emr"),
            ("EMR_HOST", "0.0.0.0"),
            ("EMR_PORT", " 9090 "),
            ("EMR_POOL_SIZE", "4"),
            ("EMR_PAGE_SIZE", "50"),
            ("RUST_LOG", "emr_clinic=debug"),
        ])
        .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.log_filter, "emr_clinic=debug");
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = config_from(&[("DATABASE_URL", "postgres://db/emr"), ("EMR_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("EMR_PORT"));
    }

    #[test]
    fn zero_pool_is_rejected() {
        assert!(config_from(&[("DATABASE_URL", "postgres://db/emr"), ("EMR_POOL_SIZE", "0")]).is_err());
    }
}
