//! tcflow Cloud Infrastructure
//!
//! Vendor-neutral core for declarative management of cloud resources: the
//! building blocks every provider composes (retry, pagination, polling), the
//! generic reconciler driving a resource kind through create/read/update/
//! delete, and the plan/apply model working on the local state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   tcflow CLI                     │
//! │            (plan / apply / destroy)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 tcflow-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Plan / apply  ·  trait CloudProvider     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Reconciler<K: ResourceKind>              │   │
//! │  │  RetryPolicy · PaginatedLister · Poller   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐                               │
//! │  │  State Mgmt  │                               │
//! │  └──────────────┘                               │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │ tencentcloud  │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod pagination;
pub mod poller;
pub mod provider;
pub mod reconciler;
pub mod retry;
pub mod state;

// Re-exports
pub use action::{
    Action, ActionType, ApplyResult, Plan, PlanSummary, apply_plan, resolve_references,
};
pub use error::{CloudError, Result};
pub use pagination::{DEFAULT_PAGE_SIZE, Filter, Identified, Page, PageCursor, PaginatedLister};
pub use poller::StatusPoller;
pub use provider::{AuthStatus, CloudProvider, ResourceConfig, ResourceSet};
pub use reconciler::{
    Capabilities, FieldChange, Reconciler, ResourceKind, UpdatePhase, UpdateStep, changed_fields,
};
pub use retry::{RetryPolicy, RetryableOutcome};
pub use state::{GlobalState, ResourceState, ResourceStatus, StateLock, StateManager};
