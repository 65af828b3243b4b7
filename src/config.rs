use serde::{Deserialize, Deserializer};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error as ThisError;
use tracing::{error, info};

use crate::logging;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by the server and the interactive client, read from a JSON file such as:
///
/// ```json
/// {"server_host": "localhost", "server_port": 6379, "log_level": "info"}
/// ```
///
/// Missing fields take their default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub server_port: u16,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: DEFAULT_HOST.to_string(),
            server_port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Loads the file at `path`, falling back to the defaults when it is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Config {
        let path = path.as_ref();

        Config::load(path).unwrap_or_else(|e| Config::fallback(path, e))
    }

    /// Like [`Config::load_or_default`], but installs logging at the configured level first, so
    /// a load failure is reported through the subscriber.
    pub fn load_and_init_logging(path: impl AsRef<Path>) -> Config {
        let path = path.as_ref();

        match Config::load(path) {
            Ok(config) => {
                logging::init(&config.log_level);
                config
            }
            Err(e) => {
                logging::init(DEFAULT_LOG_LEVEL);
                Config::fallback(path, e)
            }
        }
    }

    fn fallback(path: &Path, err: ConfigError) -> Config {
        error!("Failed to load configuration from {}: {}", path.display(), err);
        info!("Using default configuration");
        Config::default()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Ports are accepted both as JSON numbers and as strings.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {:?}", text))),
    }
}
