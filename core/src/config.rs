//! Backend settings loaded from the app's bundled key file.
//!
//! The host ships a small JSON document next to the binary. It selects
//! between a local development backend and the remote deployment, and
//! carries the route/GUID/region triple the host needs to register with its
//! platform SDK.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:8090";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Talk to `base_request_url_local` instead of the remote deployment.
    pub is_local: bool,
    pub base_request_url_local: String,
    pub base_request_url_remote: String,
    pub app_route: String,
    pub app_guid: String,
    pub app_region: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            is_local: true,
            base_request_url_local: DEFAULT_LOCAL_BASE_URL.to_string(),
            base_request_url_remote: String::new(),
            app_route: String::new(),
            app_guid: String::new(),
            app_region: String::new(),
        }
    }
}

/// Identity of the backend application, handed to the host's platform SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration<'a> {
    pub route: &'a str,
    pub guid: &'a str,
    pub region: &'a str,
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Base URL for the mode selected by `is_local`.
    pub fn base_request_url(&self) -> &str {
        if self.is_local {
            &self.base_request_url_local
        } else {
            &self.base_request_url_remote
        }
    }

    pub fn registration(&self) -> Registration<'_> {
        Registration {
            route: &self.app_route,
            guid: &self.app_guid,
            region: &self.app_region,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_request_url().trim().is_empty() {
            let mode = if self.is_local { "local" } else { "remote" };
            return Err(ConfigError::MissingBaseUrl { mode });
        }
        Ok(())
    }
}
