//! HTTP Server Configuration
//!
//! Bind address, seed files and log level, read from the JSON config file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 3030)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seed file for ordinary collections
    #[serde(default)]
    pub seed_data: Option<PathBuf>,

    /// Seed file for users and sessions
    #[serde(default)]
    pub protected_data: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            seed_data: None,
            protected_data: None,
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the values that cannot be caught by deserialization
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be > 0".to_string());
        }
        for (key, path) in [
            ("seed_data", &self.seed_data),
            ("protected_data", &self.protected_data),
        ] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(format!("{}: file not found: {}", key, path.display()));
                }
            }
        }
        Ok(())
    }
}
