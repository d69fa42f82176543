//! API credentials

use crate::error::{Result, TencentError};
use serde::Deserialize;
use std::path::Path;

pub const ENV_SECRET_ID: &str = "TENCENTCLOUD_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "TENCENTCLOUD_SECRET_KEY";
pub const ENV_REGION: &str = "TENCENTCLOUD_REGION";

pub const DEFAULT_REGION: &str = "ap-guangzhou";

/// Secret pair plus the region every request is sent to
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub secret_id: String,
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

impl Credentials {
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            region: region.into(),
        }
    }

    /// Read credentials from the environment, `None` if the secret pair is absent
    pub fn from_env() -> Option<Self> {
        let secret_id = std::env::var(ENV_SECRET_ID).ok().filter(|v| !v.is_empty())?;
        let secret_key = std::env::var(ENV_SECRET_KEY).ok().filter(|v| !v.is_empty())?;
        let region = std::env::var(ENV_REGION)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_region);
        Some(Self::new(secret_id, secret_key, region))
    }

    /// Read a JSON credentials file: `{"secret_id", "secret_key", "region"?}`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let creds: Self =
            serde_json::from_str(&content).map_err(|e| TencentError::InvalidCredentials {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if creds.secret_id.is_empty() || creds.secret_key.is_empty() {
            return Err(TencentError::InvalidCredentials {
                path: path.display().to_string(),
                reason: "secret_id and secret_key must not be empty".to_string(),
            });
        }
        Ok(creds)
    }

    /// Environment first, then `~/.config/tcflow/credentials.json`.
    ///
    /// `TENCENTCLOUD_REGION` overrides the region from the file.
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_env() {
            tracing::debug!("Using credentials from environment");
            return Ok(creds);
        }

        let path = tcflow_config::credentials_path()?;
        if !path.exists() {
            return Err(TencentError::MissingCredentials(path.display().to_string()));
        }

        let mut creds = Self::from_file(&path)?;
        if let Ok(region) = std::env::var(ENV_REGION)
            && !region.is_empty()
        {
            creds.region = region;
        }
        tracing::debug!("Using credentials from {}", path.display());
        Ok(creds)
    }
}
