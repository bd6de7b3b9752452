/*!
 * Configuration types for Orbit Uplink
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, UplinkError};

/// Main configuration for an upload run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Server hostname or IP address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of parallel uploads (one worker thread each)
    #[serde(default = "default_num_uploads")]
    pub num_uploads: usize,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Print the per-worker summary table after the run
    #[serde(default = "default_true")]
    pub show_table: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_num_uploads() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            num_uploads: default_num_uploads(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            show_table: true,
        }
    }
}

impl UploadConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UplinkError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: UploadConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Reject settings that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        if self.num_uploads == 0 {
            return Err(UplinkError::Config(
                "num_uploads must be at least 1".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(UplinkError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }

    /// Target address for every worker in the run
    pub fn server_address(&self) -> ServerAddress {
        ServerAddress::new(self.host.clone(), self.port)
    }
}

/// Network address of the upload server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
