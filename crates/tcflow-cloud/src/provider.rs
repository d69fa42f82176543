//! Cloud provider trait definition

use crate::error::{CloudError, Result};
use crate::state::ResourceState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cloud provider abstraction trait
///
/// A provider exposes its resource kinds through a JSON-level interface so the
/// plan/apply driver can work on declared resources without knowing their
/// typed specs. Each call handles exactly one remote object.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "tencentcloud")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Position of a resource type in dependency order, `None` if unsupported
    fn apply_order(&self, resource_type: &str) -> Option<u32>;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Create the remote object for a declared resource
    async fn create(&self, resource: &ResourceConfig) -> Result<ResourceState>;

    /// Read back the remote object, `None` once it no longer exists
    async fn read(&self, state: &ResourceState) -> Result<Option<ResourceState>>;

    /// Reconcile an existing object towards a new declaration
    async fn update(&self, state: &ResourceState, desired: &ResourceConfig)
    -> Result<ResourceState>;

    /// Delete the remote object
    async fn destroy(&self, state: &ResourceState) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Set of declared resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by type:name
    pub resources: HashMap<String, ResourceConfig>,
}

/// On-disk layout of a resources file
#[derive(Debug, Deserialize)]
struct ResourcesFile {
    resources: Vec<ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a resources file: `{"resources": [{"type", "name", "config"}, ...]}`
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ResourcesFile = serde_json::from_str(content)?;
        let mut set = Self::new();
        for resource in file.resources {
            let key = resource.key();
            if set.resources.contains_key(&key) {
                return Err(CloudError::InvalidConfig(format!(
                    "resource {} is declared twice",
                    key
                )));
            }
            set.add(resource);
        }
        Ok(set)
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, resource_type: &str, name: &str) -> Option<&ResourceConfig> {
        let key = format!("{}:{}", resource_type, name);
        self.resources.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }
}

fn default_provider() -> String {
    "tencentcloud".to_string()
}

/// Declaration of a single cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "vpc", "instance")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Local name, unique per type
    pub name: String,

    /// Provider name
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Resource-specific configuration
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: default_provider(),
            config,
        }
    }

    /// Get the full resource key (type:name)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.name)
    }

    /// Same declaration with a different config body
    pub fn with_config(&self, config: serde_json::Value) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    /// Get a configuration value as a specific type
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
