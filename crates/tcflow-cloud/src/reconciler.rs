//! Generic create/read/update/delete reconciliation
//!
//! A [`ResourceKind`] knows how to talk to the vendor API for one kind of
//! object; the [`Reconciler`] drives it through the retry policy, the status
//! poller and the update state machine, using the kind's [`Capabilities`].

use crate::error::{CloudError, Result};
use crate::pagination::Identified;
use crate::poller::StatusPoller;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Declared capability set of a resource kind
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Resource type name (e.g. "vpc", "instance")
    pub kind: &'static str,

    /// Fields that cannot be changed in place
    unsupported_updates: BTreeSet<&'static str>,

    /// Statuses that count as "created and usable"
    pub ready_statuses: Vec<&'static str>,

    pub create_retry: RetryPolicy,
    transient_create_codes: Vec<&'static str>,

    pub delete_retry: RetryPolicy,
    transient_delete_codes: Vec<&'static str>,

    pub poller: StatusPoller,
}

impl Capabilities {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            unsupported_updates: BTreeSet::new(),
            ready_statuses: Vec::new(),
            create_retry: RetryPolicy::new(Duration::from_secs(60)),
            transient_create_codes: Vec::new(),
            delete_retry: RetryPolicy::new(Duration::from_secs(60)),
            transient_delete_codes: Vec::new(),
            poller: StatusPoller::default(),
        }
    }

    pub fn unsupported_updates(mut self, fields: &[&'static str]) -> Self {
        self.unsupported_updates.extend(fields.iter().copied());
        self
    }

    pub fn ready_on(mut self, statuses: &[&'static str]) -> Self {
        self.ready_statuses = statuses.to_vec();
        self
    }

    pub fn retry_create_on(mut self, codes: &[&'static str], policy: RetryPolicy) -> Self {
        self.transient_create_codes = codes.to_vec();
        self.create_retry = policy;
        self
    }

    pub fn retry_delete_on(mut self, codes: &[&'static str], policy: RetryPolicy) -> Self {
        self.transient_delete_codes = codes.to_vec();
        self.delete_retry = policy;
        self
    }

    pub fn poll_with(mut self, poller: StatusPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn supports_update_of(&self, field: &str) -> bool {
        !self.unsupported_updates.contains(field)
    }

    pub fn is_transient_create(&self, err: &CloudError) -> bool {
        err.has_code(&self.transient_create_codes)
    }

    pub fn is_transient_delete(&self, err: &CloudError) -> bool {
        err.has_code(&self.transient_delete_codes)
    }
}

/// A single top-level field that differs between two declared states
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// Compare two declared states field by field.
///
/// Both sides are serialized to JSON objects; a field absent on one side
/// compares as `null`. Changes come back sorted by field name.
pub fn changed_fields<S: Serialize>(old: &S, new: &S) -> Result<Vec<FieldChange>> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;

    let (Some(old), Some(new)) = (old.as_object(), new.as_object()) else {
        return Err(CloudError::InvalidConfig(
            "declared state must serialize to an object".to_string(),
        ));
    };

    let fields: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    Ok(fields
        .into_iter()
        .filter_map(|field| {
            let o = old.get(field).cloned().unwrap_or_default();
            let n = new.get(field).cloned().unwrap_or_default();
            (o != n).then(|| FieldChange {
                field: field.clone(),
                old: o,
                new: n,
            })
        })
        .collect())
}

/// States of the update state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UpdatePhase {
    /// Diff, reject unsupported fields, plan steps; no remote mutation
    Validate,
    /// Independent in-place modifications
    InPlace,
    /// Steps that rebuild the object and consume other pending changes
    Reinstall,
    /// Read the object back
    Refresh,
    Done,
}

impl UpdatePhase {
    /// Transition table
    pub fn next(self) -> Self {
        match self {
            UpdatePhase::Validate => UpdatePhase::InPlace,
            UpdatePhase::InPlace => UpdatePhase::Reinstall,
            UpdatePhase::Reinstall => UpdatePhase::Refresh,
            UpdatePhase::Refresh | UpdatePhase::Done => UpdatePhase::Done,
        }
    }

    /// Phases in which planned steps may run
    pub fn is_mutating(self) -> bool {
        matches!(self, UpdatePhase::InPlace | UpdatePhase::Reinstall)
    }
}

/// A scoped mutation planned by a resource kind
pub trait UpdateStep: std::fmt::Debug + Send + Sync {
    fn phase(&self) -> UpdatePhase;
}

/// Vendor binding for one kind of remote object
#[async_trait]
pub trait ResourceKind: Send + Sync {
    type Spec: Serialize + Send + Sync;
    type Observed: Identified + Send + Sync;
    type Step: UpdateStep;

    fn capabilities(&self) -> &Capabilities;

    /// Issue the creation call and return the vendor identifier
    async fn create(&self, spec: &Self::Spec) -> Result<String>;

    /// Declared state the object has right after [`create`](Self::create)
    /// when the creation call cannot carry all of `spec`. The remaining
    /// fields are then applied as update steps.
    fn as_created(&self, _spec: &Self::Spec) -> Option<Self::Spec> {
        None
    }

    /// Current status per identifier; identifiers not visible yet are omitted
    async fn statuses(&self, ids: &[String]) -> Result<HashMap<String, String>>;

    /// Describe one object, `None` when it no longer exists
    async fn describe(&self, id: &str) -> Result<Option<Self::Observed>>;

    /// Turn supported field changes into update steps, in the kind's order
    fn plan_update(
        &self,
        changes: &[FieldChange],
        old: &Self::Spec,
        new: &Self::Spec,
    ) -> Result<Vec<Self::Step>>;

    async fn apply_step(&self, id: &str, step: &Self::Step) -> Result<()>;

    /// Issue the delete call once
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Drives a [`ResourceKind`] from observed to declared state
pub struct Reconciler<K> {
    kind: K,
}

impl<K: ResourceKind> Reconciler<K> {
    pub fn new(kind: K) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    fn caps(&self) -> &Capabilities {
        self.kind.capabilities()
    }

    /// Create the object, wait until it is ready and read it back.
    ///
    /// Fields the creation call cannot set are applied afterwards through the
    /// update phases. If that fails the error is
    /// [`CloudError::PartiallyCreated`], which keeps the new identifier.
    pub async fn create(&self, spec: &K::Spec) -> Result<K::Observed> {
        let caps = self.caps();
        let id = caps
            .create_retry
            .run_classified(
                &format!("creating {}", caps.kind),
                |e| caps.is_transient_create(e),
                || self.kind.create(spec),
            )
            .await?;
        tracing::info!("Created {} {}", caps.kind, id);

        let ids = vec![id.clone()];
        caps.poller
            .wait_for(&ids, &caps.ready_statuses, || self.kind.statuses(&ids))
            .await?;

        if let Some(created) = self.kind.as_created(spec) {
            let applied = serde_json::to_value(&created)?;
            return self
                .update(&id, &created, spec)
                .await
                .map_err(|e| CloudError::PartiallyCreated {
                    kind: caps.kind.to_string(),
                    id: id.clone(),
                    applied,
                    source: Box::new(e),
                });
        }

        self.kind.describe(&id).await?.ok_or_else(|| {
            CloudError::Inconsistency(format!(
                "{} {} reached a ready status but cannot be described",
                caps.kind, id
            ))
        })
    }

    /// Read the object; `None` signals it is gone
    pub async fn read(&self, id: &str) -> Result<Option<K::Observed>> {
        let observed = self.kind.describe(id).await?;
        if observed.is_none() {
            tracing::warn!("{} {} not found, treating as deleted", self.caps().kind, id);
        }
        Ok(observed)
    }

    /// Apply the difference between `old` and `new` to the object `id`.
    ///
    /// Every changed field is checked against the kind's capabilities before
    /// any mutating call; one unsupported field rejects the whole update.
    pub async fn update(&self, id: &str, old: &K::Spec, new: &K::Spec) -> Result<K::Observed> {
        let caps = self.caps();
        let mut phase = UpdatePhase::Validate;
        let mut steps: Vec<K::Step> = Vec::new();
        let mut observed = None;

        while phase != UpdatePhase::Done {
            match phase {
                UpdatePhase::Validate => {
                    let changes = changed_fields(old, new)?;
                    if let Some(change) = changes
                        .iter()
                        .find(|c| !caps.supports_update_of(&c.field))
                    {
                        return Err(CloudError::UnsupportedUpdate {
                            kind: caps.kind.to_string(),
                            field: change.field.clone(),
                        });
                    }
                    steps = self.kind.plan_update(&changes, old, new)?;
                    if let Some(step) = steps.iter().find(|s| !s.phase().is_mutating()) {
                        return Err(CloudError::InvalidConfig(format!(
                            "{} planned step {:?} outside a mutating phase",
                            caps.kind, step
                        )));
                    }
                }
                UpdatePhase::InPlace | UpdatePhase::Reinstall => {
                    for step in steps.iter().filter(|s| s.phase() == phase) {
                        tracing::debug!("Updating {} {}: {:?}", caps.kind, id, step);
                        self.kind.apply_step(id, step).await?;
                    }
                }
                UpdatePhase::Refresh => {
                    observed = Some(
                        self.kind
                            .describe(id)
                            .await?
                            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?,
                    );
                }
                UpdatePhase::Done => {}
            }
            phase = phase.next();
        }

        observed.ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))
    }

    /// Delete the object, retrying the kind's transient codes
    pub async fn delete(&self, id: &str) -> Result<()> {
        let caps = self.caps();
        caps.delete_retry
            .run_classified(
                &format!("deleting {} {}", caps.kind, id),
                |e| caps.is_transient_delete(e),
                || self.kind.delete(id),
            )
            .await?;
        tracing::info!("Deleted {} {}", caps.kind, id);
        Ok(())
    }
}
