//! # Registry Configuration
//!
//! The only deployment setting is the owner identity. It is read from a
//! YAML file and may be overridden by the `DLR_OWNER` environment variable:
//!
//! ```yaml
//! owner: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dlr_core::{Address, ValidationError};

/// Environment variable that overrides the configured owner.
pub const OWNER_ENV: &str = "DLR_OWNER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid owner from {origin}: {source}")]
    InvalidOwner {
        origin: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("no owner configured: pass --config or set DLR_OWNER")]
    MissingOwner,
}

/// Deployment configuration for a [`LicenseRegistry`](crate::LicenseRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Identity allowed to add authorities.
    pub owner: Address,
}

impl RegistryConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.owner.require_nonzero("owner").map_err(|source| {
            ConfigError::InvalidOwner {
                origin: "config file",
                source,
            }
        })?;
        Ok(config)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(path = %path.display(), owner = %config.owner, "registry config loaded");
        Ok(config)
    }

    /// Combine an optional file config with an optional override value.
    ///
    /// The override wins when present. Fails with `MissingOwner` if neither
    /// supplies an owner.
    pub fn with_override(
        file: Option<Self>,
        owner_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        match owner_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let owner = Address::parse(raw)
                    .and_then(|a| a.require_nonzero("owner"))
                    .map_err(|source| ConfigError::InvalidOwner {
                        origin: OWNER_ENV,
                        source,
                    })?;
                if let Some(file) = &file {
                    if file.owner != owner {
                        tracing::info!(
                            file_owner = %file.owner,
                            %owner,
                            "owner overridden by DLR_OWNER"
                        );
                    }
                }
                Ok(Self { owner })
            }
            None => file.ok_or(ConfigError::MissingOwner),
        }
    }

    /// Apply the `DLR_OWNER` environment override to `file`.
    pub fn with_env_override(file: Option<Self>) -> Result<Self, ConfigError> {
        let env = std::env::var(OWNER_ENV).ok();
        Self::with_override(file, env.as_deref())
    }
}
