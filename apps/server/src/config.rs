//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use jamroom_core::Credentials;
use serde::Deserialize;

/// Default credentials, matching the development client.
const DEFAULT_USERNAME: &str = "testuser";
const DEFAULT_PASSWORD: &str = "password";

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `PORT`
    pub port: u16,

    /// Redis address (`host:port`) probed by the health endpoint.
    /// If not specified the health check reports the backend as healthy.
    /// Override: `REDIS_ADDR`
    pub kv_addr: Option<String>,

    /// Username accepted by the login endpoint.
    /// Override: `JAMROOM_AUTH_USERNAME`
    pub auth_username: String,

    /// Password accepted by the login endpoint.
    /// Override: `JAMROOM_AUTH_PASSWORD`
    pub auth_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            kv_addr: None,
            auth_username: DEFAULT_USERNAME.to_string(),
            auth_password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }

        if let Ok(val) = std::env::var("REDIS_ADDR") {
            if !val.is_empty() {
                self.kv_addr = Some(val);
            }
        }

        if let Ok(val) = std::env::var("JAMROOM_AUTH_USERNAME") {
            self.auth_username = val;
        }

        if let Ok(val) = std::env::var("JAMROOM_AUTH_PASSWORD") {
            self.auth_password = val;
        }
    }

    /// Credentials for the login endpoint.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.auth_username.clone(),
            password: self.auth_password.clone(),
        }
    }

    /// True if the login credentials were never changed from the defaults.
    pub fn using_default_credentials(&self) -> bool {
        self.auth_username == DEFAULT_USERNAME && self.auth_password == DEFAULT_PASSWORD
    }
}
