//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// The call never produced a vendor response (network, auth, signing).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Structured error returned inside an otherwise successful response.
    #[error("API error [{code}]: {message} (request id: {request_id})")]
    Vendor {
        code: String,
        message: String,
        request_id: String,
    },

    /// Remote data contradicts itself (duplicate ids, missing fields).
    #[error("Inconsistent remote state: {0}")]
    Inconsistency(String),

    #[error("Update of {kind} field '{field}' is not supported")]
    UnsupportedUpdate { kind: String, field: String },

    /// The object exists remotely but a follow-up call after creation failed.
    /// `applied` is the declared state the object is known to match.
    #[error("{kind} {id} was created but not fully configured: {source}")]
    PartiallyCreated {
        kind: String,
        id: String,
        applied: serde_json::Value,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Timeout while {operation}: {last}")]
    Timeout { operation: String, last: String },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn vendor(
        code: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self::Vendor {
            code: code.into(),
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, last: impl std::fmt::Display) -> Self {
        Self::Timeout {
            operation: operation.into(),
            last: last.to_string(),
        }
    }

    /// Vendor error code, if this error came back from the remote API
    pub fn vendor_code(&self) -> Option<&str> {
        match self {
            Self::Vendor { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the vendor returned one of `codes`
    pub fn has_code(&self, codes: &[&str]) -> bool {
        self.vendor_code().is_some_and(|c| codes.contains(&c))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
