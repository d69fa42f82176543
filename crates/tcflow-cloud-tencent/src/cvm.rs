//! CVM (virtual machine) service calls

use crate::client::{Ack, ApiRequest, TencentCloudClient};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tcflow_cloud::{CloudError, Identified, Page, PaginatedLister, Result};

const SERVICE: &str = "cvm";

/// Observed state of an instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub instance_name: String,
    pub instance_type: String,
    pub instance_status: String,
    pub availability_zone: String,
    pub project_id: i64,
    pub image_id: String,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub allocate_public_ip: bool,
    pub internet_max_bandwidth_out: i64,
    pub system_disk_type: String,
    pub system_disk_size: i64,
    pub data_disks: Vec<DataDiskInfo>,
    pub security_groups: Vec<String>,
    pub key_name: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub create_time: String,
}

impl Identified for InstanceInfo {
    fn identifier(&self) -> &str {
        &self.instance_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataDiskInfo {
    pub data_disk_type: String,
    pub data_disk_size: i64,
    pub delete_with_instance: bool,
}

// Wire shapes

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RawPlacement {
    zone: String,
    project_id: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RawDisk {
    disk_type: String,
    disk_size: i64,
    delete_with_instance: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RawInternet {
    internet_max_bandwidth_out: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RawVirtualPrivateCloud {
    vpc_id: String,
    subnet_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RawLoginSettings {
    key_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawInstance {
    instance_id: String,
    #[serde(default)]
    instance_name: String,
    #[serde(default)]
    instance_type: String,
    #[serde(default)]
    instance_state: String,
    #[serde(default)]
    placement: RawPlacement,
    #[serde(default)]
    image_id: String,
    #[serde(default)]
    private_ip_addresses: Option<Vec<String>>,
    #[serde(default)]
    public_ip_addresses: Option<Vec<String>>,
    #[serde(default)]
    internet_accessible: RawInternet,
    #[serde(default)]
    system_disk: RawDisk,
    #[serde(default)]
    data_disks: Option<Vec<RawDisk>>,
    #[serde(default)]
    security_group_ids: Option<Vec<String>>,
    #[serde(default)]
    login_settings: RawLoginSettings,
    #[serde(default)]
    virtual_private_cloud: RawVirtualPrivateCloud,
    #[serde(default)]
    created_time: String,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl From<RawInstance> for InstanceInfo {
    fn from(raw: RawInstance) -> Self {
        let public_ip = raw
            .public_ip_addresses
            .unwrap_or_default()
            .into_iter()
            .next();
        Self {
            instance_id: raw.instance_id,
            instance_name: raw.instance_name,
            instance_type: raw.instance_type,
            instance_status: raw.instance_state,
            availability_zone: raw.placement.zone,
            project_id: raw.placement.project_id,
            image_id: raw.image_id,
            private_ip: raw
                .private_ip_addresses
                .unwrap_or_default()
                .into_iter()
                .next(),
            allocate_public_ip: public_ip.is_some(),
            public_ip,
            internet_max_bandwidth_out: raw.internet_accessible.internet_max_bandwidth_out,
            system_disk_type: raw.system_disk.disk_type,
            system_disk_size: raw.system_disk.disk_size,
            data_disks: raw
                .data_disks
                .unwrap_or_default()
                .into_iter()
                .map(|d| DataDiskInfo {
                    data_disk_type: d.disk_type,
                    data_disk_size: d.disk_size,
                    delete_with_instance: d.delete_with_instance,
                })
                .collect(),
            security_groups: raw.security_group_ids.unwrap_or_default(),
            key_name: raw.login_settings.key_ids.into_iter().next(),
            vpc_id: non_empty(raw.virtual_private_cloud.vpc_id),
            subnet_id: non_empty(raw.virtual_private_cloud.subnet_id),
            create_time: raw.created_time,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesResponse {
    #[serde(default)]
    instance_id_set: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    total_count: u64,
    #[serde(default)]
    instance_set: Vec<RawInstance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawInstanceStatus {
    instance_id: String,
    instance_state: String,
}

impl Identified for RawInstanceStatus {
    fn identifier(&self) -> &str {
        &self.instance_id
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesStatusResponse {
    total_count: u64,
    #[serde(default)]
    instance_status_set: Vec<RawInstanceStatus>,
}

/// Typed wrapper over the CVM API actions
#[derive(Clone)]
pub struct CvmService {
    client: TencentCloudClient,
}

impl CvmService {
    pub fn new(client: TencentCloudClient) -> Self {
        Self { client }
    }

    /// Issue a prepared `RunInstances` request, returning the new ids
    pub async fn run_instances(&self, request: &ApiRequest) -> Result<Vec<String>> {
        let response: RunInstancesResponse = self.client.call(SERVICE, request).await?;
        if response.instance_id_set.is_empty() {
            return Err(CloudError::Inconsistency(
                "RunInstances returned no instance id".to_string(),
            ));
        }
        Ok(response.instance_id_set)
    }

    pub async fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceInfo>> {
        PaginatedLister::new("instance")
            .collect(|cursor| async move {
                let request = ApiRequest::new("DescribeInstances")
                    .list("InstanceIds", instance_ids)
                    .page(cursor);
                let response: DescribeInstancesResponse =
                    self.client.call(SERVICE, &request).await?;
                Ok(Page::new(
                    response.total_count,
                    response.instance_set.into_iter().map(InstanceInfo::from).collect(),
                ))
            })
            .await
    }

    pub async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        let found = self.describe_instances(&[instance_id.to_string()]).await?;
        Ok(found.into_iter().find(|i| i.instance_id == instance_id))
    }

    /// Current state per instance id; ids the API does not report yet are omitted
    pub async fn instance_statuses(&self, instance_ids: &[String]) -> Result<HashMap<String, String>> {
        let statuses = PaginatedLister::new("instance status")
            .collect(|cursor| async move {
                let request = ApiRequest::new("DescribeInstancesStatus")
                    .list("InstanceIds", instance_ids)
                    .page(cursor);
                let response: DescribeInstancesStatusResponse =
                    self.client.call(SERVICE, &request).await?;
                Ok(Page::new(response.total_count, response.instance_status_set))
            })
            .await?;
        Ok(statuses
            .into_iter()
            .map(|s| (s.instance_id, s.instance_state))
            .collect())
    }

    pub async fn rename(&self, instance_ids: &[String], name: &str) -> Result<()> {
        let request = ApiRequest::new("ModifyInstancesAttribute")
            .list("InstanceIds", instance_ids)
            .param("InstanceName", name);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn modify_project(&self, instance_ids: &[String], project_id: i64) -> Result<()> {
        let request = ApiRequest::new("ModifyInstancesProject")
            .list("InstanceIds", instance_ids)
            .param("ProjectId", project_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn bind_key_pair(&self, instance_id: &str, key_id: &str) -> Result<()> {
        let request = ApiRequest::new("AssociateInstancesKeyPairs")
            .param("InstanceIds.0", instance_id)
            .param("KeyIds.0", key_id)
            .flag("ForceStop", true);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn reset_password(&self, instance_id: &str, password: &str) -> Result<()> {
        let request = ApiRequest::new("ResetInstancesPassword")
            .param("InstanceIds.0", instance_id)
            .param("Password", password)
            .flag("ForceStop", true);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn set_security_groups(&self, instance_id: &str, group_ids: &[String]) -> Result<()> {
        let request = ApiRequest::new("ModifyInstancesAttribute")
            .param("InstanceIds.0", instance_id)
            .list("SecurityGroups", group_ids);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    /// Reinstall the system disk from `image_id` with fresh login settings
    pub async fn reset_instance(
        &self,
        instance_id: &str,
        image_id: &str,
        password: Option<&str>,
        key_id: Option<&str>,
    ) -> Result<()> {
        let request = ApiRequest::new("ResetInstance")
            .param("InstanceId", instance_id)
            .param("ImageId", image_id)
            .opt_param("LoginSettings.Password", password)
            .opt_param("LoginSettings.KeyIds.0", key_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }

    pub async fn terminate(&self, instance_id: &str) -> Result<()> {
        let request = ApiRequest::new("TerminateInstances").param("InstanceIds.0", instance_id);
        self.client.call::<Ack>(SERVICE, &request).await?;
        Ok(())
    }
}
