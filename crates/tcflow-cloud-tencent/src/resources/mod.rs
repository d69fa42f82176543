//! Resource kinds managed through the generic reconciler
//!
//! Each kind pairs a declared spec with the observed info type of its service
//! and declares its [`Capabilities`](tcflow_cloud::Capabilities).

pub mod instance;
pub mod route_entry;
pub mod route_table;
pub mod subnet;
pub mod vpc;

pub use instance::{DataDisk, InstanceKind, InstanceSpec, InstanceStep};
pub use route_entry::{RouteEntryInfo, RouteEntryKind, RouteEntrySpec};
pub use route_table::{RouteTableKind, RouteTableSpec, RouteTableStep};
pub use subnet::{SubnetKind, SubnetSpec, SubnetStep};
pub use vpc::{VpcKind, VpcSpec, VpcStep};

use serde::Serialize;
use tcflow_cloud::{Identified, ResourceStatus};

/// Status every listed network object reports
pub const AVAILABLE: &str = "AVAILABLE";

/// Observed objects as recorded in local state
pub trait Observed: Identified + Serialize {
    fn status(&self) -> ResourceStatus;
}

impl Observed for crate::vpc::VpcInfo {
    fn status(&self) -> ResourceStatus {
        ResourceStatus::Available
    }
}

impl Observed for crate::vpc::SubnetInfo {
    fn status(&self) -> ResourceStatus {
        ResourceStatus::Available
    }
}

impl Observed for crate::vpc::RouteTableInfo {
    fn status(&self) -> ResourceStatus {
        ResourceStatus::Available
    }
}

impl Observed for crate::cvm::InstanceInfo {
    fn status(&self) -> ResourceStatus {
        match self.instance_status.as_str() {
            "PENDING" | "STARTING" | "REBOOTING" => ResourceStatus::Creating,
            "RUNNING" => ResourceStatus::Running,
            "STOPPED" | "STOPPING" => ResourceStatus::Stopped,
            "TERMINATING" | "SHUTDOWN" => ResourceStatus::Deleting,
            "LAUNCH_FAILED" => ResourceStatus::Error,
            _ => ResourceStatus::Unknown,
        }
    }
}

fn default_true() -> bool {
    true
}
