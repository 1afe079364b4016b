use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    /// Base URL this server is reachable at; used for the post-create check trigger.
    pub api_url: String,
    pub log_dir: String,
    pub probe_timeout_seconds: u64,
    pub max_concurrent_checks: usize,
    pub scheduler_enabled: bool,
    pub scheduler_tick_seconds: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    api_url: Option<String>,
    log_dir: Option<String>,
    probe_timeout_seconds: Option<u64>,
    max_concurrent_checks: Option<usize>,
    scheduler_enabled: Option<bool>,
    scheduler_tick_seconds: Option<u64>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_api_url() -> String {
    "http://localhost:8787".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_PROBE_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 8;
const DEFAULT_SCHEDULER_TICK_SECONDS: u64 = 5;

impl PartialServerConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            listen_addr: lookup("LISTEN_ADDR"),
            database_url: lookup("DATABASE_URL"),
            jwt_secret: lookup("JWT_SECRET"),
            api_url: lookup("API_URL"),
            log_dir: lookup("LOG_DIR"),
            probe_timeout_seconds: parse_var(&lookup, "PROBE_TIMEOUT_SECONDS")?,
            max_concurrent_checks: parse_var(&lookup, "MAX_CONCURRENT_CHECKS")?,
            scheduler_enabled: parse_var(&lookup, "SCHEDULER_ENABLED")?,
            scheduler_tick_seconds: parse_var(&lookup, "SCHEDULER_TICK_SECONDS")?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(None),
    }
}

impl ServerConfig {
    /// A config with every optional field at its default.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            api_url: default_api_url(),
            log_dir: default_log_dir(),
            probe_timeout_seconds: DEFAULT_PROBE_TIMEOUT_SECONDS,
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
            scheduler_enabled: true,
            scheduler_tick_seconds: DEFAULT_SCHEDULER_TICK_SECONDS,
        }
    }

    /// Loads `.env`, the optional TOML file and the process environment;
    /// environment variables override file values.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(config_path: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Load from file (optional)
        let file_config: PartialServerConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_lookup(lookup)?;

        // 3. Merge: environment overrides file
        let database_url = env_config
            .database_url
            .or(file_config.database_url)
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = env_config
            .jwt_secret
            .or(file_config.jwt_secret)
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let defaults = Self::new(database_url, jwt_secret);
        let config = ServerConfig {
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or(defaults.listen_addr),
            api_url: env_config
                .api_url
                .or(file_config.api_url)
                .unwrap_or(defaults.api_url),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or(defaults.log_dir),
            probe_timeout_seconds: env_config
                .probe_timeout_seconds
                .or(file_config.probe_timeout_seconds)
                .unwrap_or(defaults.probe_timeout_seconds),
            max_concurrent_checks: env_config
                .max_concurrent_checks
                .or(file_config.max_concurrent_checks)
                .unwrap_or(defaults.max_concurrent_checks),
            scheduler_enabled: env_config
                .scheduler_enabled
                .or(file_config.scheduler_enabled)
                .unwrap_or(defaults.scheduler_enabled),
            scheduler_tick_seconds: env_config
                .scheduler_tick_seconds
                .or(file_config.scheduler_tick_seconds)
                .unwrap_or(defaults.scheduler_tick_seconds),
            ..defaults
        };

        if config.probe_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROBE_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }
        if config.max_concurrent_checks == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_CONCURRENT_CHECKS",
                value: "0".to_string(),
            });
        }

        Ok(config)
    }
}
