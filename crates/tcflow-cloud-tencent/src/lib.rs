//! Tencent Cloud provider for tcflow
//!
//! Implements the `CloudProvider` trait on top of the Tencent Cloud VPC and
//! CVM APIs. Each resource type is a [`ResourceKind`](tcflow_cloud::ResourceKind)
//! driven by the generic reconciler.
//!
//! # Resource types
//!
//! - `vpc`, `subnet`, `route_table`, `route_entry`
//! - `instance` (CVM)
//!
//! # Authentication
//!
//! Credentials come from `TENCENTCLOUD_SECRET_ID` / `TENCENTCLOUD_SECRET_KEY`
//! (`TENCENTCLOUD_REGION` optional) or from `~/.config/tcflow/credentials.json`.
//!
//! # Example
//!
//! ```ignore
//! use tcflow_cloud::CloudProvider;
//! use tcflow_cloud_tencent::{Credentials, TencentCloudProvider};
//!
//! let provider = TencentCloudProvider::new(Credentials::load()?)?;
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! for vpc in provider.vpcs(None, Some("prod")).await? {
//!     println!("{} {:?}", vpc.vpc.vpc_id, vpc.subnet_ids);
//! }
//! ```

pub mod client;
pub mod codes;
pub mod config;
pub mod cvm;
pub mod error;
pub mod provider;
pub mod resources;
pub mod vpc;

pub use client::{ApiRequest, HttpTransport, TencentCloudClient, Transport};
pub use config::Credentials;
pub use cvm::{CvmService, InstanceInfo};
pub use error::{Result, TencentError};
pub use provider::{PROVIDER_NAME, RESOURCE_TYPES, TencentCloudProvider, VpcInstance};
pub use vpc::{RouteTableInfo, SubnetInfo, VpcInfo, VpcService};
