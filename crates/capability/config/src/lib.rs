//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub gps_addr: String,
    pub max_connections: usize,
    pub idle_timeout_seconds: u64,
    pub write_timeout_seconds: u64,
    pub max_line_bytes: usize,
    pub shutdown_grace_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("FLEET_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("FLEET_DATABASE_URL".to_string()))?;
        let db_max_connections = read_u32_with_default("FLEET_DB_MAX_CONNECTIONS", 8)?;
        let gps_addr = env::var("FLEET_GPS_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
        let max_connections = read_usize_with_default("FLEET_MAX_CONNECTIONS", 1024)?;
        let idle_timeout_seconds = read_positive_u64("FLEET_IDLE_TIMEOUT_SECONDS", 300)?;
        let write_timeout_seconds = read_positive_u64("FLEET_WRITE_TIMEOUT_SECONDS", 10)?;
        let max_line_bytes = read_usize_with_default("FLEET_MAX_LINE_BYTES", 512)?;
        let shutdown_grace_seconds = read_u64_with_default("FLEET_SHUTDOWN_GRACE_SECONDS", 10)?;

        if max_connections == 0 {
            return Err(ConfigError::Invalid(
                "FLEET_MAX_CONNECTIONS".to_string(),
                "0".to_string(),
            ));
        }
        if max_line_bytes == 0 {
            return Err(ConfigError::Invalid(
                "FLEET_MAX_LINE_BYTES".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            db_max_connections,
            gps_addr,
            max_connections,
            idle_timeout_seconds,
            write_timeout_seconds,
            max_line_bytes,
            shutdown_grace_seconds,
        })
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 超时类配置不允许为 0。
fn read_positive_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match read_u64_with_default(key, default)? {
        0 => Err(ConfigError::Invalid(key.to_string(), "0".to_string())),
        value => Ok(value),
    }
}
