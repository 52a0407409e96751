use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://discoveryengine.googleapis.com/v1alpha";
pub const DEFAULT_SERVING_CONFIG: &str = "projects/341304510567/locations/global/collections/default_collection/engines/doe-test_1745604392169/servingConfigs/default_search";
pub const DEFAULT_TOKEN_COMMAND: &str = "gcloud auth print-access-token";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_host: String,
    pub port: u16,
    pub discovery_endpoint: String,
    pub serving_config: String,
    pub token_command: String,
    /// Zero disables the token cache.
    pub token_cache_ttl: Duration,
    pub static_dir: String,
    pub api_url: String,
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_host: "0.0.0.0".to_string(),
            port: 5001,
            discovery_endpoint: DEFAULT_ENDPOINT.to_string(),
            serving_config: DEFAULT_SERVING_CONFIG.to_string(),
            token_command: DEFAULT_TOKEN_COMMAND.to_string(),
            token_cache_ttl: Duration::ZERO,
            static_dir: "static".to_string(),
            api_url: "http://127.0.0.1:5001".to_string(),
            log_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    /// Load from the process environment, after a `.env` file if present.
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from a key lookup, falling back to defaults for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let api_url = lookup("DOE_API_URL")
            .or_else(|| lookup("VITE_API_URL"))
            .unwrap_or(defaults.api_url);

        Ok(Config {
            bind_host: get_or_default(&lookup, "BIND_HOST", &defaults.bind_host),
            port: parse_or_default(&lookup, "PORT", defaults.port)?,
            discovery_endpoint: get_or_default(
                &lookup,
                "DISCOVERY_ENGINE_ENDPOINT",
                &defaults.discovery_endpoint,
            ),
            serving_config: get_or_default(
                &lookup,
                "DISCOVERY_ENGINE_SERVING_CONFIG",
                &defaults.serving_config,
            ),
            token_command: get_or_default(&lookup, "TOKEN_COMMAND", &defaults.token_command),
            token_cache_ttl: Duration::from_secs(parse_or_default(
                &lookup,
                "TOKEN_CACHE_TTL_SECS",
                0u64,
            )?),
            static_dir: get_or_default(&lookup, "STATIC_DIR", &defaults.static_dir),
            api_url,
            log_level: parse_or_default(&lookup, "LOG_LEVEL", defaults.log_level)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Program and arguments of the credential command.
    pub fn token_command_parts(&self) -> Result<(String, Vec<String>)> {
        let mut parts = self.token_command.split_whitespace().map(str::to_string);
        let program = parts.next().context("TOKEN_COMMAND must not be empty")?;
        Ok((program, parts.collect()))
    }
}

fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for environment variable {key}: {e}")),
        None => Ok(default),
    }
}
