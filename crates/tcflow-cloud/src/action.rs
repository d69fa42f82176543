//! Planning and applying changes to declared resources
//!
//! A [`Plan`] compares the declared [`ResourceSet`] with the local state file
//! and lists one [`Action`] per resource. Declarations may reference other
//! resources with `"${type.name.id}"` (or any observed attribute in place of
//! `id`); references are resolved against state, so a subnet declared with
//! `"${vpc.main.id}"` picks up the VPC identifier once the VPC exists.

use crate::error::{CloudError, Result};
use crate::provider::{CloudProvider, ResourceConfig, ResourceSet};
use crate::reconciler::changed_fields;
use crate::state::{GlobalState, ResourceState, ResourceStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Represents a planned action for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Resource key (type:name)
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "vpc", "instance")
    pub resource_type: String,

    /// Local resource name
    pub resource_name: String,

    /// Description of the action
    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, Value>,
}

impl Action {
    fn new(action_type: ActionType, resource_type: &str, resource_name: &str) -> Self {
        let id = format!("{}:{}", resource_type, resource_name);
        Self {
            description: format!("{} {}", action_type, id),
            id,
            action_type,
            resource_type: resource_type.to_string(),
            resource_name: resource_name.to_string(),
            details: HashMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform, in execution order
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Compare declarations with state.
    ///
    /// Deletes of resources no longer declared (only with `prune`) come first
    /// in reverse dependency order, followed by creates and updates in
    /// dependency order.
    pub fn build(
        provider: &dyn CloudProvider,
        desired: &ResourceSet,
        state: &GlobalState,
        prune: bool,
    ) -> Result<Self> {
        let order = |resource_type: &str| {
            provider.apply_order(resource_type).ok_or_else(|| {
                CloudError::InvalidConfig(format!(
                    "{} does not manage resource type '{}'",
                    provider.display_name(),
                    resource_type
                ))
            })
        };

        let mut deletes = Vec::new();
        if prune {
            for (key, resource) in &state.resources {
                if desired.resources.contains_key(key) {
                    continue;
                }
                let name = key.split_once(':').map(|(_, n)| n).unwrap_or(key);
                let action = Action::new(ActionType::Delete, &resource.resource_type, name)
                    .with_detail("vendor_id", Value::String(resource.id.clone()));
                deletes.push((order(&resource.resource_type)?, action));
            }
        }

        let mut changes = Vec::new();
        for resource in desired.iter() {
            let rank = order(&resource.resource_type)?;
            let action = match state.get_resource(&resource.key()) {
                None => Action::new(ActionType::Create, &resource.resource_type, &resource.name),
                Some(current) => {
                    let fields = pending_changes(resource, current, state)?;
                    if fields.is_empty() {
                        Action::new(ActionType::NoOp, &resource.resource_type, &resource.name)
                    } else {
                        Action::new(ActionType::Update, &resource.resource_type, &resource.name)
                            .with_detail(
                                "changed",
                                Value::Array(fields.into_iter().map(Value::String).collect()),
                            )
                            .with_detail("vendor_id", Value::String(current.id.clone()))
                    }
                }
            };
            changes.push((rank, action));
        }

        deletes.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        changes.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        Ok(Self::new(
            deletes.into_iter().chain(changes).map(|(_, a)| a).collect(),
        ))
    }

    /// Plan the deletion of everything recorded in state
    pub fn destroy_all(provider: &dyn CloudProvider, state: &GlobalState) -> Result<Self> {
        Self::build(provider, &ResourceSet::new(), state, true)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

/// Top-level fields whose declared value differs from what was last applied.
///
/// A reference to a resource that is not in state yet counts as a change of
/// that field.
fn pending_changes(
    resource: &ResourceConfig,
    current: &ResourceState,
    state: &GlobalState,
) -> Result<Vec<String>> {
    let resolved = match resolve_references(&resource.config, state) {
        Ok(resolved) => resolved,
        Err(CloudError::InvalidConfig(_)) => resource.config.clone(),
        Err(e) => return Err(e),
    };
    if resolved.is_object() && current.config.is_object() {
        Ok(changed_fields(&current.config, &resolved)?
            .into_iter()
            .map(|c| c.field)
            .collect())
    } else if resolved != current.config {
        Ok(vec!["config".to_string()])
    } else {
        Ok(Vec::new())
    }
}

fn parse_reference(raw: &str) -> Option<(&str, &str, &str)> {
    let inner = raw.strip_prefix("${")?.strip_suffix('}')?;
    let mut parts = inner.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(t), Some(n), Some(attr)) if !t.is_empty() && !n.is_empty() && !attr.is_empty() => {
            Some((t, n, attr))
        }
        _ => None,
    }
}

/// Replace every `"${type.name.attr}"` string in `value` with the recorded value
pub fn resolve_references(value: &Value, state: &GlobalState) -> Result<Value> {
    match value {
        Value::String(raw) => match parse_reference(raw) {
            Some((resource_type, name, attr)) => {
                let key = format!("{}:{}", resource_type, name);
                let resource = state.get_resource(&key).ok_or_else(|| {
                    CloudError::InvalidConfig(format!("{} refers to unknown resource {}", raw, key))
                })?;
                if attr == "id" {
                    return Ok(Value::String(resource.id.clone()));
                }
                resource.attributes.get(attr).cloned().ok_or_else(|| {
                    CloudError::InvalidConfig(format!("{} has no attribute '{}'", key, attr))
                })
            }
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_references(item, state))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                resolved.insert(k.clone(), resolve_references(v, state)?);
            }
            Ok(Value::Object(resolved))
        }
        _ => Ok(value.clone()),
    }
}

/// Execute a plan action by action, recording every outcome in `state`.
///
/// A failed action does not stop the run; later actions that reference the
/// failed resource fail on reference resolution instead.
pub async fn apply_plan(
    provider: &dyn CloudProvider,
    plan: &Plan,
    desired: &ResourceSet,
    state: &mut GlobalState,
) -> ApplyResult {
    let start = Instant::now();
    let mut result = ApplyResult::new();

    for action in &plan.actions {
        if action.action_type == ActionType::NoOp {
            continue;
        }
        tracing::info!("Applying: {}", action.description);

        match apply_action(provider, action, desired, state).await {
            Ok(message) => {
                tracing::info!("{}", message);
                result.add_success(action.id.clone(), message);
            }
            Err(e) => {
                tracing::error!("{} failed: {}", action.description, e);
                result.add_failure(action.id.clone(), e.to_string());
            }
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

async fn apply_action(
    provider: &dyn CloudProvider,
    action: &Action,
    desired: &ResourceSet,
    state: &mut GlobalState,
) -> Result<String> {
    match action.action_type {
        ActionType::Create => {
            let declared = declared_for(action, desired)?;
            let resolved = declared.with_config(resolve_references(&declared.config, state)?);
            let created = match provider.create(&resolved).await {
                Ok(created) => created,
                Err(e) => {
                    if let CloudError::PartiallyCreated { id, applied, .. } = &e {
                        // keep ownership; the next plan updates it to the declaration
                        state.set_resource(
                            action.id.clone(),
                            ResourceState::new(id.clone(), &action.resource_type)
                                .with_status(ResourceStatus::Error)
                                .with_config(applied.clone()),
                        );
                    }
                    return Err(e);
                }
            };
            let message = format!("Created {} ({})", action.id, created.id);
            state.set_resource(action.id.clone(), created.with_config(resolved.config));
            Ok(message)
        }
        ActionType::Update => {
            let declared = declared_for(action, desired)?;
            let resolved = declared.with_config(resolve_references(&declared.config, state)?);
            let current = state
                .get_resource(&action.id)
                .cloned()
                .ok_or_else(|| CloudError::ResourceNotFound(action.id.clone()))?;
            let updated = provider.update(&current, &resolved).await?;
            let message = format!("Updated {} ({})", action.id, updated.id);
            state.set_resource(
                action.id.clone(),
                updated
                    .with_config(resolved.config)
                    .created_at(current.created_at),
            );
            Ok(message)
        }
        ActionType::Delete => {
            let current = state
                .get_resource(&action.id)
                .cloned()
                .ok_or_else(|| CloudError::ResourceNotFound(action.id.clone()))?;
            provider.destroy(&current).await?;
            state.remove_resource(&action.id);
            Ok(format!("Deleted {} ({})", action.id, current.id))
        }
        ActionType::NoOp => Ok(format!("{} unchanged", action.id)),
    }
}

fn declared_for<'a>(action: &Action, desired: &'a ResourceSet) -> Result<&'a ResourceConfig> {
    desired
        .get(&action.resource_type, &action.resource_name)
        .ok_or_else(|| CloudError::ResourceNotFound(action.id.clone()))
}
