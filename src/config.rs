use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::monitor::{DISPLAY_WINDOW_MS, WINDOW_MS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the HTTP/WebSocket listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Samples per second. Drives both the tick period and the detector's
    /// window size, so it is deliberately a single knob.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Directory of static client assets served next to the socket.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Optional history bound. Unset keeps all samples in memory.
    #[serde(default)]
    pub retention_secs: Option<u64>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_sample_rate() -> f64 {
    0.1
}

fn default_assets_dir() -> String {
    "client".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            sample_rate: default_sample_rate(),
            assets_dir: default_assets_dir(),
            retention_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid config format: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "sample_rate must be a positive number of samples per second".to_string(),
            ));
        }

        self.listen_socket_addr()?;

        if let Some(retention_ms) = self.retention_ms() {
            let floor_ms = WINDOW_MS.max(DISPLAY_WINDOW_MS);
            if retention_ms <= floor_ms {
                return Err(ConfigError::Validation(format!(
                    "retention_secs must exceed the {} second display window",
                    floor_ms / 1000
                )));
            }
        }

        Ok(())
    }

    pub fn listen_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "listen_addr is not a socket address: {:?}",
                self.listen_addr
            ))
        })
    }

    pub fn retention_ms(&self) -> Option<i64> {
        self.retention_secs
            .map(|secs| i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000))
    }

    /// Tick period derived from the sample rate.
    pub fn sample_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.sample_rate)
    }
}

/// A missing file is not an error: the daemon runs on pure defaults.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    if !Path::new(path).exists() {
        log::info!("config_file_missing path={} using_defaults=true", path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}
