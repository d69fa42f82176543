//! Tencent Cloud provider implementation

use crate::client::{ApiRequest, TencentCloudClient};
use crate::codes;
use crate::config::Credentials;
use crate::cvm::CvmService;
use crate::error::Result as TencentResult;
use crate::resources::{
    InstanceKind, Observed, RouteEntryKind, RouteTableKind, SubnetKind, VpcKind,
};
use crate::vpc::{SubnetQuery, VpcInfo, VpcService};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tcflow_cloud::{
    AuthStatus, CloudError, CloudProvider, Filter, Reconciler, ResourceConfig, ResourceKind,
    ResourceState, Result,
};

pub const PROVIDER_NAME: &str = "tencentcloud";

pub const VPC: &str = "vpc";
pub const SUBNET: &str = "subnet";
pub const ROUTE_TABLE: &str = "route_table";
pub const ROUTE_ENTRY: &str = "route_entry";
pub const INSTANCE: &str = "instance";

/// Managed resource types in dependency order
pub const RESOURCE_TYPES: [&str; 5] = [VPC, ROUTE_TABLE, SUBNET, ROUTE_ENTRY, INSTANCE];

/// One entry of the VPC listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcInstance {
    #[serde(flatten)]
    pub vpc: VpcInfo,
    pub subnet_ids: Vec<String>,
}

/// Tencent Cloud provider
pub struct TencentCloudProvider {
    region: String,
    vpc: VpcService,
    vpcs: Reconciler<VpcKind>,
    subnets: Reconciler<SubnetKind>,
    route_tables: Reconciler<RouteTableKind>,
    route_entries: Reconciler<RouteEntryKind>,
    instances: Reconciler<InstanceKind>,
}

impl TencentCloudProvider {
    /// Provider talking HTTPS with the given credentials
    pub fn new(credentials: Credentials) -> TencentResult<Self> {
        let region = credentials.region.clone();
        let client = TencentCloudClient::from_credentials(credentials)?;
        Ok(Self::with_client(client, region))
    }

    /// Provider over an arbitrary transport
    pub fn with_client(client: TencentCloudClient, region: impl Into<String>) -> Self {
        let vpc = VpcService::new(client.clone());
        let cvm = CvmService::new(client);
        Self {
            region: region.into(),
            vpcs: Reconciler::new(VpcKind::new(vpc.clone())),
            subnets: Reconciler::new(SubnetKind::new(vpc.clone())),
            route_tables: Reconciler::new(RouteTableKind::new(vpc.clone())),
            route_entries: Reconciler::new(RouteEntryKind::new(vpc.clone())),
            instances: Reconciler::new(InstanceKind::new(cvm)),
            vpc,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// List VPCs, optionally narrowed by id and name, with their subnet ids
    pub async fn vpcs(&self, vpc_id: Option<&str>, name: Option<&str>) -> Result<Vec<VpcInstance>> {
        let mut filters = Vec::new();
        if let Some(id) = vpc_id {
            filters.push(Filter::new("vpc-id", id));
        }
        if let Some(name) = name {
            filters.push(Filter::new("vpc-name", name));
        }

        let mut result = Vec::new();
        for vpc in self.vpc.describe_vpcs(&filters).await? {
            let subnets = self
                .vpc
                .describe_subnets(&SubnetQuery {
                    vpc_id: Some(&vpc.vpc_id),
                    ..Default::default()
                })
                .await?;
            result.push(VpcInstance {
                subnet_ids: subnets.into_iter().map(|s| s.subnet_id).collect(),
                vpc,
            });
        }
        Ok(result)
    }
}

fn unsupported(resource_type: &str) -> CloudError {
    CloudError::InvalidConfig(format!(
        "{} does not manage resource type '{}'",
        PROVIDER_NAME, resource_type
    ))
}

fn parse_spec<S: DeserializeOwned>(resource_type: &str, config: &serde_json::Value) -> Result<S> {
    serde_json::from_value(config.clone()).map_err(|e| {
        CloudError::InvalidConfig(format!("invalid {} declaration: {}", resource_type, e))
    })
}

fn to_state<O: Observed>(resource_type: &str, observed: &O) -> Result<ResourceState> {
    Ok(ResourceState::new(observed.identifier(), resource_type)
        .with_status(observed.status())
        .with_observed(serde_json::to_value(observed)?))
}

async fn create_with<K>(reconciler: &Reconciler<K>, resource: &ResourceConfig) -> Result<ResourceState>
where
    K: ResourceKind,
    K::Spec: DeserializeOwned,
    K::Observed: Observed,
{
    let spec: K::Spec = parse_spec(&resource.resource_type, &resource.config)?;
    let observed = reconciler.create(&spec).await?;
    to_state(&resource.resource_type, &observed)
}

async fn read_with<K>(reconciler: &Reconciler<K>, state: &ResourceState) -> Result<Option<ResourceState>>
where
    K: ResourceKind,
    K::Observed: Observed,
{
    match reconciler.read(&state.id).await? {
        Some(observed) => Ok(Some(
            to_state(&state.resource_type, &observed)?
                .with_config(state.config.clone())
                .created_at(state.created_at),
        )),
        None => Ok(None),
    }
}

async fn update_with<K>(
    reconciler: &Reconciler<K>,
    state: &ResourceState,
    desired: &ResourceConfig,
) -> Result<ResourceState>
where
    K: ResourceKind,
    K::Spec: DeserializeOwned,
    K::Observed: Observed,
{
    let old: K::Spec = parse_spec(&state.resource_type, &state.config)?;
    let new: K::Spec = parse_spec(&desired.resource_type, &desired.config)?;
    let observed = reconciler.update(&state.id, &old, &new).await?;
    to_state(&state.resource_type, &observed)
}

#[async_trait]
impl CloudProvider for TencentCloudProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "Tencent Cloud"
    }

    fn apply_order(&self, resource_type: &str) -> Option<u32> {
        RESOURCE_TYPES
            .iter()
            .position(|t| *t == resource_type)
            .map(|i| i as u32)
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        let request = ApiRequest::new("DescribeVpcs").param("Limit", 1);
        match self
            .vpc
            .client()
            .call::<serde_json::Value>("vpc", &request)
            .await
        {
            Ok(_) => Ok(AuthStatus::ok(format!("region {}", self.region))),
            Err(e)
                if e
                    .vendor_code()
                    .is_some_and(|c| c.starts_with(codes::AUTH_FAILURE_PREFIX)) =>
            {
                Ok(AuthStatus::failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn create(&self, resource: &ResourceConfig) -> Result<ResourceState> {
        tracing::info!("Creating {} {}", resource.resource_type, resource.name);
        match resource.resource_type.as_str() {
            VPC => create_with(&self.vpcs, resource).await,
            SUBNET => create_with(&self.subnets, resource).await,
            ROUTE_TABLE => create_with(&self.route_tables, resource).await,
            ROUTE_ENTRY => create_with(&self.route_entries, resource).await,
            INSTANCE => create_with(&self.instances, resource).await,
            other => Err(unsupported(other)),
        }
    }

    async fn read(&self, state: &ResourceState) -> Result<Option<ResourceState>> {
        match state.resource_type.as_str() {
            VPC => read_with(&self.vpcs, state).await,
            SUBNET => read_with(&self.subnets, state).await,
            ROUTE_TABLE => read_with(&self.route_tables, state).await,
            ROUTE_ENTRY => read_with(&self.route_entries, state).await,
            INSTANCE => read_with(&self.instances, state).await,
            other => Err(unsupported(other)),
        }
    }

    async fn update(&self, state: &ResourceState, desired: &ResourceConfig) -> Result<ResourceState> {
        tracing::info!("Updating {} {}", state.resource_type, state.id);
        match state.resource_type.as_str() {
            VPC => update_with(&self.vpcs, state, desired).await,
            SUBNET => update_with(&self.subnets, state, desired).await,
            ROUTE_TABLE => update_with(&self.route_tables, state, desired).await,
            ROUTE_ENTRY => update_with(&self.route_entries, state, desired).await,
            INSTANCE => update_with(&self.instances, state, desired).await,
            other => Err(unsupported(other)),
        }
    }

    async fn destroy(&self, state: &ResourceState) -> Result<()> {
        tracing::info!("Destroying {} {}", state.resource_type, state.id);
        match state.resource_type.as_str() {
            VPC => self.vpcs.delete(&state.id).await,
            SUBNET => self.subnets.delete(&state.id).await,
            ROUTE_TABLE => self.route_tables.delete(&state.id).await,
            ROUTE_ENTRY => self.route_entries.delete(&state.id).await,
            INSTANCE => self.instances.delete(&state.id).await,
            other => Err(unsupported(other)),
        }
    }
}
