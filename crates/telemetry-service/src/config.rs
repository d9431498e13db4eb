//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telemetry_store::DEFAULT_HISTORY_CAPACITY;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Binary ingestion listener settings.
    pub ingest: IngestConfig,
    /// HTTP query API settings.
    pub http: HttpConfig,
    /// Device store settings.
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Both bind addresses are valid (host:port format, non-zero port)
    /// - The two listeners do not share a bind address
    /// - The idle timeout is within bounds (1s - 1 day)
    /// - The history capacity is within bounds (1 - 10000)
    ///
    /// # Example
    ///
    /// ```
    /// use telemetry_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.ingest.validate());
        errors.extend(self.http.validate());
        errors.extend(self.store.validate());

        if !self.ingest.bind.is_empty() && self.ingest.bind == self.http.bind {
            errors.push(ValidationError {
                field: "http.bind".to_string(),
                message: format!(
                    "'{}' is already used by ingest.bind",
                    self.http.bind
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Binary ingestion listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bind address (e.g., "0.0.0.0:9001").
    pub bind: String,
    /// Seconds a connection may stay silent before it is closed.
    pub idle_timeout_secs: u64,
}

/// Minimum idle timeout in seconds.
pub const MIN_IDLE_TIMEOUT: u64 = 1;
/// Maximum idle timeout in seconds (1 day).
pub const MAX_IDLE_TIMEOUT: u64 = 86_400;

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9001".to_string(),
            idle_timeout_secs: 300,
        }
    }
}

impl IngestConfig {
    /// Validate ingestion configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = validate_bind("ingest.bind", &self.bind);

        if self.idle_timeout_secs < MIN_IDLE_TIMEOUT {
            errors.push(ValidationError {
                field: "ingest.idle_timeout_secs".to_string(),
                message: format!(
                    "idle timeout {} is too short (minimum {} second)",
                    self.idle_timeout_secs, MIN_IDLE_TIMEOUT
                ),
            });
        } else if self.idle_timeout_secs > MAX_IDLE_TIMEOUT {
            errors.push(ValidationError {
                field: "ingest.idle_timeout_secs".to_string(),
                message: format!(
                    "idle timeout {} is too long (maximum {} seconds / 1 day)",
                    self.idle_timeout_secs, MAX_IDLE_TIMEOUT
                ),
            });
        }

        errors
    }

    /// Idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// HTTP query API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl HttpConfig {
    /// Validate HTTP configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        validate_bind("http.bind", &self.bind)
    }
}

/// Device store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Readings kept per device before the oldest is evicted.
    pub history_capacity: usize,
}

/// Largest accepted per-device history capacity.
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Validate store configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.history_capacity == 0 {
            errors.push(ValidationError {
                field: "store.history_capacity".to_string(),
                message: "history capacity cannot be 0".to_string(),
            });
        } else if self.history_capacity > MAX_HISTORY_CAPACITY {
            errors.push(ValidationError {
                field: "store.history_capacity".to_string(),
                message: format!(
                    "history capacity {} is too large (maximum {})",
                    self.history_capacity, MAX_HISTORY_CAPACITY
                ),
            });
        }

        errors
    }
}

fn validate_bind(field: &str, bind: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if bind.is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: "bind address cannot be empty".to_string(),
        });
        return errors;
    }

    let parts: Vec<&str> = bind.rsplitn(2, ':').collect();
    if parts.len() != 2 {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!(
                "invalid bind address '{}': expected format 'host:port'",
                bind
            ),
        });
        return errors;
    }

    let port_str = parts[0];
    match port_str.parse::<u16>() {
        Ok(0) => errors.push(ValidationError {
            field: field.to_string(),
            message: "port cannot be 0".to_string(),
        }),
        Err(_) => errors.push(ValidationError {
            field: field.to_string(),
            message: format!("invalid port '{}': must be a number 1-65535", port_str),
        }),
        Ok(_) => {}
    }

    errors
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `ingest.bind` or `store.history_capacity`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telemetry")
        .join("server.toml")
}
