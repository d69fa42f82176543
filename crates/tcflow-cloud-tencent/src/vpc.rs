//! VPC service calls: networks, subnets, route tables and routes

use crate::client::{Ack, ApiRequest, TencentCloudClient};
use serde::{Deserialize, Serialize};
use tcflow_cloud::{CloudError, Filter, Identified, Page, PaginatedLister, Result};

const SERVICE: &str = "vpc";

/// Observed state of a VPC
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcInfo {
    pub vpc_id: String,
    pub name: String,
    pub cidr_block: String,
    pub is_multicast: bool,
    pub is_default: bool,
    pub dns_servers: Vec<String>,
    pub create_time: String,
}

impl Identified for VpcInfo {
    fn identifier(&self) -> &str {
        &self.vpc_id
    }
}

/// Observed state of a subnet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubnetInfo {
    pub subnet_id: String,
    pub vpc_id: String,
    pub route_table_id: String,
    pub name: String,
    pub cidr_block: String,
    pub is_multicast: bool,
    pub is_default: bool,
    pub availability_zone: String,
    pub available_ip_count: i64,
    pub create_time: String,
}

impl Identified for SubnetInfo {
    fn identifier(&self) -> &str {
        &self.subnet_id
    }
}

/// One route inside a route table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    pub route_id: i64,
    pub destination_cidr_block: String,
    pub next_type: String,
    pub next_hub: String,
    pub description: String,
    pub entry_type: String,
}

/// Observed state of a route table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTableInfo {
    pub route_table_id: String,
    pub vpc_id: String,
    pub name: String,
    pub is_default: bool,
    pub subnet_ids: Vec<String>,
    pub routes: Vec<RouteInfo>,
    pub create_time: String,
}

impl Identified for RouteTableInfo {
    fn identifier(&self) -> &str {
        &self.route_table_id
    }
}

/// Optional narrowing of a subnet listing
#[derive(Debug, Clone, Default)]
pub struct SubnetQuery<'a> {
    pub subnet_ids: &'a [String],
    pub vpc_id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub zone: Option<&'a str>,
}

/// Route attributes used both to create a route and to find it again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec<'a> {
    pub destination_cidr_block: &'a str,
    pub next_type: &'a str,
    pub next_hub: &'a str,
    pub description: Option<&'a str>,
}

// Wire shapes

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawVpc {
    vpc_id: String,
    #[serde(default)]
    vpc_name: String,
    #[serde(default)]
    cidr_block: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    enable_multicast: bool,
    #[serde(default)]
    dns_server_set: Vec<String>,
    #[serde(default)]
    created_time: String,
}

impl From<RawVpc> for VpcInfo {
    fn from(raw: RawVpc) -> Self {
        Self {
            vpc_id: raw.vpc_id,
            name: raw.vpc_name,
            cidr_block: raw.cidr_block,
            is_multicast: raw.enable_multicast,
            is_default: raw.is_default,
            dns_servers: raw.dns_server_set,
            create_time: raw.created_time,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSubnet {
    subnet_id: String,
    #[serde(default)]
    vpc_id: String,
    #[serde(default)]
    route_table_id: String,
    #[serde(default)]
    subnet_name: String,
    #[serde(default)]
    cidr_block: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    enable_broadcast: bool,
    #[serde(default)]
    zone: String,
    #[serde(default)]
    available_ip_address_count: i64,
    #[serde(default)]
    created_time: String,
}

impl From<RawSubnet> for SubnetInfo {
    fn from(raw: RawSubnet) -> Self {
        Self {
            subnet_id: raw.subnet_id,
            vpc_id: raw.vpc_id,
            route_table_id: raw.route_table_id,
            name: raw.subnet_name,
            cidr_block: raw.cidr_block,
            is_multicast: raw.enable_broadcast,
            is_default: raw.is_default,
            availability_zone: raw.zone,
            available_ip_count: raw.available_ip_address_count,
            create_time: raw.created_time,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAssociation {
    subnet_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRoute {
    route_id: i64,
    #[serde(default)]
    destination_cidr_block: String,
    #[serde(default)]
    gateway_type: String,
    #[serde(default)]
    gateway_id: String,
    #[serde(default)]
    route_description: String,
    #[serde(default)]
    route_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRouteTable {
    route_table_id: String,
    #[serde(default)]
    route_table_name: String,
    #[serde(default)]
    vpc_id: String,
    #[serde(default)]
    main: bool,
    #[serde(default)]
    association_set: Vec<RawAssociation>,
    #[serde(default)]
    route_set: Vec<RawRoute>,
    #[serde(default)]
    created_time: String,
}

impl From<RawRouteTable> for RouteTableInfo {
    fn from(raw: RawRouteTable) -> Self {
        Self {
            route_table_id: raw.route_table_id,
            vpc_id: raw.vpc_id,
            name: raw.route_table_name,
            is_default: raw.main,
            subnet_ids: raw.association_set.into_iter().map(|a| a.subnet_id).collect(),
            routes: raw
                .route_set
                .into_iter()
                .map(|r| RouteInfo {
                    route_id: r.route_id,
                    destination_cidr_block: r.destination_cidr_block,
                    next_type: r.gateway_type,
                    next_hub: r.gateway_id,
                    description: r.route_description,
                    entry_type: r.route_type,
                })
                .collect(),
            create_time: raw.created_time,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcsResponse {
    total_count: u64,
    #[serde(default)]
    vpc_set: Vec<RawVpc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSubnetsResponse {
    total_count: u64,
    #[serde(default)]
    subnet_set: Vec<RawSubnet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeRouteTablesResponse {
    total_count: u64,
    #[serde(default)]
    route_table_set: Vec<RawRouteTable>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatedVpc {
    vpc_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateVpcResponse {
    vpc: CreatedVpc,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatedSubnet {
    subnet_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSubnetResponse {
    subnet: CreatedSubnet,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatedRouteTable {
    route_table_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRouteTableResponse {
    route_table: CreatedRouteTable,
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CloudError::InvalidConfig(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Typed wrapper over the VPC API actions
#[derive(Clone)]
pub struct VpcService {
    client: TencentCloudClient,
}

impl VpcService {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &TencentCloudClient {
        &self.client
    }

    // VPC

    pub async fn create_vpc(
        &self,
        name: &str,
        cidr_block: &str,
        is_multicast: bool,
        dns_servers: &[String],
    ) -> Result<String> {
        let request = ApiRequest::new("CreateVpc")
            .param("VpcName", name)
            .param("CidrBlock", cidr_block)
            .param("EnableMulticast", is_multicast)
            .list("DnsServers", dns_servers);
        let response: CreateVpcResponse = self.client.call(SERVICE, &request).await?;
        Ok(response.vpc.vpc_id)
    }

    /// List VPCs matching every given filter
    pub async fn describe_vpcs(&self, filters: &[Filter]) -> Result<Vec<VpcInfo>> {
        PaginatedLister::new("vpc")
            .collect(|cursor| async move {
                let request = ApiRequest::new("DescribeVpcs").filters(filters).page(cursor);
                let response: DescribeVpcsResponse = self.client.call(SERVICE, &request).await?;
                Ok(Page::new(
                    response.total_count,
                    response.vpc_set.into_iter().map(VpcInfo::from).collect(),
                ))
            })
            .await
    }

    pub async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<VpcInfo>> {
        require("vpc_id", vpc_id)?;
        let found = self
            .describe_vpcs(&[Filter::new("vpc-id", vpc_id)])
            .await?;
        Ok(found.into_iter().find(|v| v.vpc_id == vpc_id))
    }

    pub async fn modify_vpc_attribute(
        &self,
        vpc_id: &str,
        name: &str,
        is_multicast: bool,
        dns_servers: &[String],
    ) -> Result<()> {
        require("vpc_id", vpc_id)?;
        let request = ApiRequest::new("ModifyVpcAttribute")
            .param("VpcId", vpc_id)
            .param("VpcName", name)
            .param("EnableMulticast", is_multicast)
            .list("DnsServers", dns_servers);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        require("vpc_id", vpc_id)?;
        let request = ApiRequest::new("DeleteVpc").param("VpcId", vpc_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    // Subnet

    pub async fn create_subnet(
        &self,
        vpc_id: &str,
        name: &str,
        cidr_block: &str,
        zone: &str,
    ) -> Result<String> {
        require("vpc_id", vpc_id)?;
        let request = ApiRequest::new("CreateSubnet")
            .param("VpcId", vpc_id)
            .param("SubnetName", name)
            .param("CidrBlock", cidr_block)
            .param("Zone", zone);
        let response: CreateSubnetResponse = self.client.call(SERVICE, &request).await?;
        Ok(response.subnet.subnet_id)
    }

    pub async fn describe_subnets(&self, query: &SubnetQuery<'_>) -> Result<Vec<SubnetInfo>> {
        let mut filters = Vec::new();
        if !query.subnet_ids.is_empty() {
            filters.push(Filter::with_values("subnet-id", query.subnet_ids));
        }
        if let Some(vpc_id) = query.vpc_id {
            filters.push(Filter::new("vpc-id", vpc_id));
        }
        if let Some(name) = query.name {
            filters.push(Filter::new("subnet-name", name));
        }
        if let Some(zone) = query.zone {
            filters.push(Filter::new("zone", zone));
        }
        let filters = &filters;

        PaginatedLister::new("subnet")
            .collect(|cursor| async move {
                let request = ApiRequest::new("DescribeSubnets").filters(filters).page(cursor);
                let response: DescribeSubnetsResponse =
                    self.client.call(SERVICE, &request).await?;
                Ok(Page::new(
                    response.total_count,
                    response.subnet_set.into_iter().map(SubnetInfo::from).collect(),
                ))
            })
            .await
    }

    pub async fn describe_subnet(&self, subnet_id: &str) -> Result<Option<SubnetInfo>> {
        require("subnet_id", subnet_id)?;
        let ids = [subnet_id.to_string()];
        let found = self
            .describe_subnets(&SubnetQuery {
                subnet_ids: &ids,
                ..Default::default()
            })
            .await?;
        Ok(found.into_iter().find(|s| s.subnet_id == subnet_id))
    }

    pub async fn modify_subnet_attribute(
        &self,
        subnet_id: &str,
        name: &str,
        is_multicast: bool,
    ) -> Result<()> {
        require("subnet_id", subnet_id)?;
        let request = ApiRequest::new("ModifySubnetAttribute")
            .param("SubnetId", subnet_id)
            .param("SubnetName", name)
            .param("EnableBroadcast", is_multicast);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn replace_route_table_association(
        &self,
        subnet_id: &str,
        route_table_id: &str,
    ) -> Result<()> {
        require("subnet_id", subnet_id)?;
        require("route_table_id", route_table_id)?;
        let request = ApiRequest::new("ReplaceRouteTableAssociation")
            .param("SubnetId", subnet_id)
            .param("RouteTableId", route_table_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        require("subnet_id", subnet_id)?;
        let request = ApiRequest::new("DeleteSubnet").param("SubnetId", subnet_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    // Route table

    pub async fn create_route_table(&self, vpc_id: &str, name: &str) -> Result<String> {
        require("vpc_id", vpc_id)?;
        let request = ApiRequest::new("CreateRouteTable")
            .param("VpcId", vpc_id)
            .param("RouteTableName", name);
        let response: CreateRouteTableResponse = self.client.call(SERVICE, &request).await?;
        Ok(response.route_table.route_table_id)
    }

    pub async fn describe_route_tables(&self, filters: &[Filter]) -> Result<Vec<RouteTableInfo>> {
        PaginatedLister::new("route table")
            .collect(|cursor| async move {
                let request = ApiRequest::new("DescribeRouteTables")
                    .filters(filters)
                    .page(cursor);
                let response: DescribeRouteTablesResponse =
                    self.client.call(SERVICE, &request).await?;
                Ok(Page::new(
                    response.total_count,
                    response
                        .route_table_set
                        .into_iter()
                        .map(RouteTableInfo::from)
                        .collect(),
                ))
            })
            .await
    }

    pub async fn describe_route_table(&self, route_table_id: &str) -> Result<Option<RouteTableInfo>> {
        require("route_table_id", route_table_id)?;
        let found = self
            .describe_route_tables(&[Filter::new("route-table-id", route_table_id)])
            .await?;
        Ok(found
            .into_iter()
            .find(|t| t.route_table_id == route_table_id))
    }

    pub async fn modify_route_table_attribute(&self, route_table_id: &str, name: &str) -> Result<()> {
        require("route_table_id", route_table_id)?;
        let request = ApiRequest::new("ModifyRouteTableAttribute")
            .param("RouteTableId", route_table_id)
            .param("RouteTableName", name);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn delete_route_table(&self, route_table_id: &str) -> Result<()> {
        require("route_table_id", route_table_id)?;
        let request = ApiRequest::new("DeleteRouteTable").param("RouteTableId", route_table_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    // Routes

    /// Add one route; the vendor does not return its id, see [`Self::find_route_id`]
    pub async fn create_route(&self, route_table_id: &str, route: &RouteSpec<'_>) -> Result<()> {
        require("route_table_id", route_table_id)?;
        let request = ApiRequest::new("CreateRoutes")
            .param("RouteTableId", route_table_id)
            .param("Routes.0.DestinationCidrBlock", route.destination_cidr_block)
            .param("Routes.0.GatewayType", route.next_type)
            .param("Routes.0.GatewayId", route.next_hub)
            .opt_param("Routes.0.RouteDescription", route.description);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    /// Locate a route by destination and next hop.
    ///
    /// A missing route is [`CloudError::ResourceNotFound`], which is how a
    /// freshly created route looks until the listing catches up.
    pub async fn find_route_id(&self, route_table_id: &str, route: &RouteSpec<'_>) -> Result<i64> {
        let table = self
            .describe_route_table(route_table_id)
            .await?
            .ok_or_else(|| {
                CloudError::ResourceNotFound(format!("route table {}", route_table_id))
            })?;

        let found = table.routes.iter().find(|r| {
            r.destination_cidr_block == route.destination_cidr_block
                && r.next_type == route.next_type
                && r.next_hub == route.next_hub
        });

        match found {
            Some(r) => Ok(r.route_id),
            None => {
                for r in &table.routes {
                    tracing::debug!(
                        "route {} in {}: {} via {} {}",
                        r.route_id,
                        route_table_id,
                        r.destination_cidr_block,
                        r.next_type,
                        r.next_hub
                    );
                }
                Err(CloudError::ResourceNotFound(format!(
                    "route to {} in route table {}",
                    route.destination_cidr_block, route_table_id
                )))
            }
        }
    }

    pub async fn delete_route(&self, route_table_id: &str, route_id: i64) -> Result<()> {
        require("route_table_id", route_table_id)?;
        let request = ApiRequest::new("DeleteRoutes")
            .param("RouteTableId", route_table_id)
            .param("Routes.0.RouteId", route_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }
}
