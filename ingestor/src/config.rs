use crate::errors::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_SERVER_NAME: &str = "sensor-ingestor";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub http_addr: SocketAddr,
    pub log_level: String,
    pub environment: String,
    pub server_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Builds the config from an explicit variable map; empty values count as unset.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let api_key = get("API_KEY").ok_or_else(|| {
            Error::Config("API_KEY environment variable is required".to_string())
        })?;

        let raw_addr = get("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid HTTP_ADDR {:?}: {}", raw_addr, e)))?;

        Ok(Self {
            api_key,
            http_addr,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            environment: get("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            server_name: get("SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&vars(&[("API_KEY", "k")])).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.http_addr.port(), 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.environment, "development");
        assert_eq!(config.server_name, "sensor-ingestor");
    }

    #[test]
    fn test_api_key_required() {
        assert!(matches!(
            Config::from_vars(&vars(&[])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_vars(&vars(&[("API_KEY", "")])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_overrides_and_bad_addr() {
        let config = Config::from_vars(&vars(&[
            ("API_KEY", "k"),
            ("HTTP_ADDR", "127.0.0.1:8081"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();
        assert_eq!(config.http_addr.to_string(), "127.0.0.1:8081");
        assert_eq!(config.environment, "production");

        assert!(matches!(
            Config::from_vars(&vars(&[("API_KEY", "k"), ("HTTP_ADDR", ":3000")])),
            Err(Error::Config(_))
        ));
    }
}
