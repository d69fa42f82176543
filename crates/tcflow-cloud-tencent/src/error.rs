//! Tencent Cloud provider error types

use tcflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TencentError {
    #[error(
        "credentials not found: set TENCENTCLOUD_SECRET_ID / TENCENTCLOUD_SECRET_KEY or write {0}"
    )]
    MissingCredentials(String),

    #[error("invalid credentials file {path}: {reason}")]
    InvalidCredentials { path: String, reason: String },

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid {kind} declaration: {reason}")]
    Validation { kind: &'static str, reason: String },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] tcflow_config::ConfigError),
}

impl TencentError {
    pub fn validation(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            reason: reason.into(),
        }
    }
}

impl From<TencentError> for CloudError {
    fn from(err: TencentError) -> Self {
        match err {
            TencentError::MissingCredentials(_) | TencentError::InvalidCredentials { .. } => {
                CloudError::AuthenticationFailed(err.to_string())
            }
            TencentError::Signing(_) | TencentError::Http(_) => {
                CloudError::Transport(err.to_string())
            }
            TencentError::Validation { .. } | TencentError::Config(_) => {
                CloudError::InvalidConfig(err.to_string())
            }
            TencentError::JsonError(e) => CloudError::Json(e),
            TencentError::IoError(e) => CloudError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, TencentError>;
