//! CVM instance kind
//!
//! Creation retries while the requested private IP is still held by a
//! terminated instance, then waits for `RUNNING`. Updates run in a fixed
//! order (name, project, key pair, password, security groups); an image
//! change reinstalls the system disk last and carries the new password and
//! key pair with it.

use crate::client::ApiRequest;
use crate::codes;
use crate::cvm::{CvmService, InstanceInfo};
use crate::error::TencentError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tcflow_cloud::{
    Capabilities, CloudError, FieldChange, ResourceKind, Result, RetryPolicy, UpdatePhase,
    UpdateStep,
};

pub const DEFAULT_INSTANCE_NAME: &str = "tcflow-cvm-instance";

pub const CHARGE_PREPAID: &str = "PREPAID";
pub const CHARGE_POSTPAID_BY_HOUR: &str = "POSTPAID_BY_HOUR";

const INSTANCE_CHARGE_TYPES: [&str; 2] = [CHARGE_PREPAID, CHARGE_POSTPAID_BY_HOUR];
const INTERNET_CHARGE_TYPES: [&str; 4] = [
    "BANDWIDTH_PREPAID",
    "TRAFFIC_POSTPAID_BY_HOUR",
    "BANDWIDTH_POSTPAID_BY_HOUR",
    "BANDWIDTH_PACKAGE",
];
const DISK_TYPES: [&str; 5] = [
    "LOCAL_BASIC",
    "LOCAL_SSD",
    "CLOUD_BASIC",
    "CLOUD_SSD",
    "CLOUD_PREMIUM",
];
const PREPAID_PERIODS: [u32; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 24, 36];
const RENEW_FLAGS: [&str; 3] = [
    "NOTIFY_AND_AUTO_RENEW",
    "NOTIFY_AND_MANUAL_RENEW",
    "DISABLE_NOTIFY_AND_MANUAL_RENEW",
];
const MAX_DATA_DISKS: usize = 10;
const MAX_NAME_LEN: usize = 60;

const STATUS_RUNNING: &str = "RUNNING";
const STATUS_STOPPED: &str = "STOPPED";

fn default_instance_name() -> String {
    DEFAULT_INSTANCE_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disk_size: Option<u32>,
    #[serde(default = "super::default_true")]
    pub delete_with_instance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceSpec {
    pub image_id: String,
    pub availability_zone: String,
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_charge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_charge_type_prepaid_period: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_charge_type_prepaid_renew_flag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_charge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_out: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocate_public_ip: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub security_groups: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_disk_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_disks: Vec<DataDisk>,

    #[serde(default)]
    pub disable_security_service: bool,
    #[serde(default)]
    pub disable_monitor_service: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_raw: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> std::result::Result<(), TencentError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(TencentError::validation(
            "instance",
            format!("{} must be one of {}, got {}", field, allowed.join(", "), value),
        ))
    }
}

impl InstanceSpec {
    /// Minimal declaration; every optional field unset
    pub fn new(image_id: impl Into<String>, availability_zone: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            availability_zone: availability_zone.into(),
            instance_name: default_instance_name(),
            instance_type: None,
            hostname: None,
            project_id: None,
            instance_charge_type: None,
            instance_charge_type_prepaid_period: None,
            instance_charge_type_prepaid_renew_flag: None,
            internet_charge_type: None,
            internet_max_bandwidth_out: None,
            allocate_public_ip: None,
            vpc_id: None,
            subnet_id: None,
            private_ip: None,
            security_groups: BTreeSet::new(),
            system_disk_type: None,
            system_disk_size: None,
            data_disks: Vec::new(),
            disable_security_service: false,
            disable_monitor_service: false,
            key_name: None,
            password: None,
            user_data: None,
            user_data_raw: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), TencentError> {
        let invalid = |reason: String| Err(TencentError::validation("instance", reason));

        if self.image_id.is_empty() || self.availability_zone.is_empty() {
            return invalid("image_id and availability_zone are required".to_string());
        }
        if self.instance_name.is_empty() || self.instance_name.chars().count() > MAX_NAME_LEN {
            return invalid(format!(
                "instance_name must be 1 to {} characters",
                MAX_NAME_LEN
            ));
        }

        if let Some(charge_type) = &self.instance_charge_type {
            check_one_of("instance_charge_type", charge_type, &INSTANCE_CHARGE_TYPES)?;
            if charge_type == CHARGE_PREPAID && self.instance_charge_type_prepaid_period.is_none() {
                return invalid(format!(
                    "instance_charge_type_prepaid_period is required when instance_charge_type is {}",
                    CHARGE_PREPAID
                ));
            }
        }
        if let Some(period) = self.instance_charge_type_prepaid_period
            && !PREPAID_PERIODS.contains(&period)
        {
            return invalid(format!(
                "instance_charge_type_prepaid_period must be 1-12, 24 or 36, got {}",
                period
            ));
        }
        if let Some(flag) = &self.instance_charge_type_prepaid_renew_flag {
            check_one_of("instance_charge_type_prepaid_renew_flag", flag, &RENEW_FLAGS)?;
        }
        if let Some(charge_type) = &self.internet_charge_type {
            check_one_of("internet_charge_type", charge_type, &INTERNET_CHARGE_TYPES)?;
        }

        if let Some(disk_type) = &self.system_disk_type {
            check_one_of("system_disk_type", disk_type, &DISK_TYPES)?;
        }
        if let Some(size) = self.system_disk_size
            && !(50..=1000).contains(&size)
        {
            return invalid(format!("system_disk_size must be 50-1000, got {}", size));
        }
        if self.data_disks.len() > MAX_DATA_DISKS {
            return invalid(format!(
                "at most {} data disks are allowed, got {}",
                MAX_DATA_DISKS,
                self.data_disks.len()
            ));
        }
        for disk in &self.data_disks {
            if let Some(disk_type) = &disk.data_disk_type {
                check_one_of("data_disk_type", disk_type, &DISK_TYPES)?;
            }
            if disk.data_disk_size == Some(0) {
                return invalid("data_disk_size must be positive".to_string());
            }
        }

        if self.user_data.is_some() && self.user_data_raw.is_some() {
            return invalid("user_data conflicts with user_data_raw".to_string());
        }
        Ok(())
    }

    /// Build the `RunInstances` request for this declaration
    pub fn run_request(&self) -> std::result::Result<ApiRequest, TencentError> {
        self.validate()?;

        let mut request = ApiRequest::new("RunInstances")
            .param("Placement.Zone", &self.availability_zone)
            .param("ImageId", &self.image_id)
            .param("InstanceName", &self.instance_name)
            .opt_param("InstanceType", self.instance_type.as_ref())
            .opt_param("HostName", self.hostname.as_ref())
            .opt_param("Placement.ProjectId", self.project_id);

        if let Some(charge_type) = &self.instance_charge_type {
            if charge_type == CHARGE_PREPAID {
                request = request
                    .opt_param(
                        "InstanceChargePrepaid.Period",
                        self.instance_charge_type_prepaid_period,
                    )
                    .opt_param(
                        "InstanceChargePrepaid.RenewFlag",
                        self.instance_charge_type_prepaid_renew_flag.as_ref(),
                    );
            }
            request = request.param("InstanceChargeType", charge_type);
        }

        request = request
            .opt_param(
                "InternetAccessible.InternetChargeType",
                self.internet_charge_type.as_ref(),
            )
            .opt_param(
                "InternetAccessible.InternetMaxBandwidthOut",
                self.internet_max_bandwidth_out,
            );
        if let Some(assign) = self.allocate_public_ip {
            request = request.flag("InternetAccessible.PublicIpAssigned", assign);
        }

        request = request
            .list("SecurityGroupIds", &self.security_groups)
            .opt_param("SystemDisk.DiskType", self.system_disk_type.as_ref())
            .opt_param("SystemDisk.DiskSize", self.system_disk_size);

        for (i, disk) in self.data_disks.iter().enumerate() {
            request = request
                .opt_param(format!("DataDisks.{}.DiskType", i), disk.data_disk_type.as_ref())
                .opt_param(format!("DataDisks.{}.DiskSize", i), disk.data_disk_size)
                .flag(
                    format!("DataDisks.{}.DeleteWithInstance", i),
                    disk.delete_with_instance,
                );
        }

        if self.disable_security_service {
            request = request.flag("EnhancedService.SecurityService.Enabled", false);
        }
        if self.disable_monitor_service {
            request = request.flag("EnhancedService.MonitorService.Enabled", false);
        }

        request = request
            .opt_param("LoginSettings.KeyIds.0", self.key_name.as_ref())
            .opt_param("LoginSettings.Password", self.password.as_ref());

        if let Some(data) = self.user_data.as_ref().filter(|d| !d.is_empty()) {
            request = request.param("UserData", data);
        }
        if let Some(raw) = self.user_data_raw.as_ref().filter(|d| !d.is_empty()) {
            request = request.param("UserData", BASE64.encode(raw.as_bytes()));
        }

        request = request
            .opt_param("VirtualPrivateCloud.VpcId", self.vpc_id.as_ref())
            .opt_param("VirtualPrivateCloud.SubnetId", self.subnet_id.as_ref())
            .opt_param(
                "VirtualPrivateCloud.PrivateIpAddresses.0",
                self.private_ip.as_ref(),
            );

        if !self.tags.is_empty() {
            request = request.param("TagSpecification.0.ResourceType", "instance");
            for (i, (key, value)) in self.tags.iter().enumerate() {
                request = request
                    .param(format!("TagSpecification.0.Tags.{}.Key", i), key)
                    .param(format!("TagSpecification.0.Tags.{}.Value", i), value);
            }
        }

        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceStep {
    Rename(String),
    MoveToProject(i64),
    BindKeyPair(String),
    ResetPassword(String),
    SetSecurityGroups(Vec<String>),
    /// Replace the system disk; login settings travel with it
    Reinstall {
        image_id: String,
        password: Option<String>,
        key_name: Option<String>,
    },
}

impl UpdateStep for InstanceStep {
    fn phase(&self) -> UpdatePhase {
        match self {
            InstanceStep::Reinstall { .. } => UpdatePhase::Reinstall,
            _ => UpdatePhase::InPlace,
        }
    }
}

pub struct InstanceKind {
    service: CvmService,
    caps: Capabilities,
}

impl InstanceKind {
    pub fn new(service: CvmService) -> Self {
        Self {
            service,
            caps: Capabilities::new("instance")
                .unsupported_updates(&[
                    "instance_charge_type_prepaid_period",
                    "instance_charge_type_prepaid_renew_flag",
                    "internet_charge_type",
                    "internet_max_bandwidth_out",
                    "allocate_public_ip",
                    "system_disk_size",
                    "data_disks",
                    "tags",
                ])
                // fixed at creation
                .unsupported_updates(&[
                    "availability_zone",
                    "instance_type",
                    "hostname",
                    "instance_charge_type",
                    "vpc_id",
                    "subnet_id",
                    "private_ip",
                    "system_disk_type",
                    "user_data",
                    "user_data_raw",
                    "disable_security_service",
                    "disable_monitor_service",
                ])
                .ready_on(&[STATUS_RUNNING])
                .retry_create_on(
                    &[codes::VPC_IP_IS_USED],
                    RetryPolicy::new(Duration::from_secs(60)),
                )
                .retry_delete_on(
                    &[codes::INTERNAL_ERROR],
                    RetryPolicy::new(Duration::from_secs(180)),
                ),
        }
    }
}

#[async_trait]
impl ResourceKind for InstanceKind {
    type Spec = InstanceSpec;
    type Observed = InstanceInfo;
    type Step = InstanceStep;

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn create(&self, spec: &InstanceSpec) -> Result<String> {
        let request = spec.run_request()?;
        let ids = self.service.run_instances(&request).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| CloudError::Inconsistency("RunInstances returned no instance id".to_string()))
    }

    async fn statuses(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        self.service.instance_statuses(ids).await
    }

    async fn describe(&self, id: &str) -> Result<Option<InstanceInfo>> {
        self.service.describe_instance(id).await
    }

    fn plan_update(
        &self,
        changes: &[FieldChange],
        _old: &InstanceSpec,
        new: &InstanceSpec,
    ) -> Result<Vec<InstanceStep>> {
        new.validate()?;

        let changed = |field: &str| changes.iter().any(|c| c.field == field);
        let reinstalling = changed("image_id");
        let mut steps = Vec::new();

        if changed("instance_name") {
            steps.push(InstanceStep::Rename(new.instance_name.clone()));
        }
        if changed("project_id") {
            steps.push(InstanceStep::MoveToProject(new.project_id.unwrap_or(0)));
        }
        if changed("key_name") && !reinstalling {
            let key = new.key_name.clone().ok_or_else(|| {
                CloudError::InvalidConfig("instance key_name can be replaced but not removed".to_string())
            })?;
            steps.push(InstanceStep::BindKeyPair(key));
        }
        if changed("password")
            && !reinstalling
            && let Some(password) = &new.password
        {
            steps.push(InstanceStep::ResetPassword(password.clone()));
        }
        if changed("security_groups") {
            if new.security_groups.is_empty() {
                return Err(CloudError::InvalidConfig(
                    "instance security_groups must not be empty".to_string(),
                ));
            }
            steps.push(InstanceStep::SetSecurityGroups(
                new.security_groups.iter().cloned().collect(),
            ));
        }
        if reinstalling {
            steps.push(InstanceStep::Reinstall {
                image_id: new.image_id.clone(),
                password: new.password.clone(),
                key_name: new.key_name.clone(),
            });
        }
        Ok(steps)
    }

    async fn apply_step(&self, id: &str, step: &InstanceStep) -> Result<()> {
        let ids = [id.to_string()];
        match step {
            InstanceStep::Rename(name) => {
                tracing::debug!("Renaming instance {} to {}", id, name);
                self.service.rename(&ids, name).await
            }
            InstanceStep::MoveToProject(project_id) => {
                self.service.modify_project(&ids, *project_id).await
            }
            InstanceStep::BindKeyPair(key) => {
                self.caps
                    .poller
                    .wait_for(&ids, &[STATUS_STOPPED, STATUS_RUNNING], || {
                        self.service.instance_statuses(&ids)
                    })
                    .await?;
                self.service.bind_key_pair(id, key).await
            }
            InstanceStep::ResetPassword(password) => {
                self.service.reset_password(id, password).await
            }
            InstanceStep::SetSecurityGroups(groups) => {
                self.service.set_security_groups(id, groups).await
            }
            InstanceStep::Reinstall {
                image_id,
                password,
                key_name,
            } => {
                tracing::info!("Reinstalling instance {} from image {}", id, image_id);
                self.service
                    .reset_instance(id, image_id, password.as_deref(), key_name.as_deref())
                    .await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.service.terminate(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> InstanceSpec {
        InstanceSpec::new("img-base", "ap-guangzhou-3")
    }

    fn change(field: &str) -> FieldChange {
        FieldChange {
            field: field.to_string(),
            old: serde_json::Value::Null,
            new: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_declaration_defaults() {
        let spec: InstanceSpec = serde_json::from_value(serde_json::json!({
            "image_id": "img-1",
            "availability_zone": "ap-guangzhou-3",
            "data_disks": [{"data_disk_size": 50}]
        }))
        .unwrap();

        assert_eq!(spec.instance_name, DEFAULT_INSTANCE_NAME);
        assert!(spec.data_disks[0].delete_with_instance);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed = serde_json::from_value::<InstanceSpec>(serde_json::json!({
            "image_id": "img-1",
            "availability_zone": "ap-guangzhou-3",
            "instnace_type": "S5.SMALL1"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_prepaid_needs_valid_period() {
        let mut s = spec();
        s.instance_charge_type = Some(CHARGE_PREPAID.to_string());
        assert!(s.validate().is_err());

        s.instance_charge_type_prepaid_period = Some(13);
        assert!(s.validate().is_err());

        s.instance_charge_type_prepaid_period = Some(24);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validation_limits() {
        let mut s = spec();
        s.system_disk_size = Some(49);
        assert!(s.validate().is_err());
        s.system_disk_size = Some(1000);
        assert!(s.validate().is_ok());

        s.data_disks = vec![
            DataDisk {
                data_disk_type: None,
                data_disk_size: Some(10),
                delete_with_instance: true,
            };
            11
        ];
        assert!(s.validate().is_err());

        let mut s = spec();
        s.system_disk_type = Some("CLOUD_HDD".to_string());
        assert!(s.validate().is_err());

        let mut s = spec();
        s.instance_charge_type_prepaid_renew_flag = Some("ALWAYS".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_user_data_conflict() {
        let mut s = spec();
        s.user_data = Some("IyEvYmluL3No".to_string());
        s.user_data_raw = Some("#!/bin/sh".to_string());
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("user_data_raw"));
    }

    #[test]
    fn test_run_request_encodes_disks_and_login() {
        let mut s = spec();
        s.data_disks = vec![
            DataDisk {
                data_disk_type: Some("CLOUD_SSD".to_string()),
                data_disk_size: Some(100),
                delete_with_instance: true,
            },
            DataDisk {
                data_disk_type: None,
                data_disk_size: Some(200),
                delete_with_instance: false,
            },
        ];
        s.security_groups = ["sg-b", "sg-a"].iter().map(|g| g.to_string()).collect();
        s.key_name = Some("skey-1".to_string());
        s.user_data_raw = Some("#!/bin/sh".to_string());
        s.allocate_public_ip = Some(false);

        let request = s.run_request().unwrap();
        assert_eq!(request.action(), "RunInstances");
        assert_eq!(request.get("InstanceName"), Some(DEFAULT_INSTANCE_NAME));
        assert_eq!(request.get("DataDisks.0.DiskType"), Some("CLOUD_SSD"));
        assert_eq!(request.get("DataDisks.0.DiskSize"), Some("100"));
        assert_eq!(request.get("DataDisks.1.DiskType"), None);
        assert_eq!(request.get("DataDisks.1.DiskSize"), Some("200"));
        assert_eq!(request.get("DataDisks.1.DeleteWithInstance"), Some("FALSE"));
        assert_eq!(request.get("SecurityGroupIds.0"), Some("sg-a"));
        assert_eq!(request.get("SecurityGroupIds.1"), Some("sg-b"));
        assert_eq!(request.get("LoginSettings.KeyIds.0"), Some("skey-1"));
        assert_eq!(request.get("UserData"), Some("IyEvYmluL3No"));
        assert_eq!(request.get("InternetAccessible.PublicIpAssigned"), Some("FALSE"));
        assert_eq!(request.get("InstanceChargePrepaid.Period"), None);
    }

    #[test]
    fn test_run_request_gives_each_tag_its_own_index() {
        let mut s = spec();
        s.tags.insert("env".to_string(), "prod".to_string());
        s.tags.insert("team".to_string(), "infra".to_string());
        s.tags.insert("app".to_string(), "web".to_string());

        let request = s.run_request().unwrap();
        assert_eq!(request.get("TagSpecification.0.ResourceType"), Some("instance"));
        assert_eq!(request.get("TagSpecification.0.Tags.0.Key"), Some("app"));
        assert_eq!(request.get("TagSpecification.0.Tags.1.Key"), Some("env"));
        assert_eq!(request.get("TagSpecification.0.Tags.2.Key"), Some("team"));
        assert_eq!(request.get("TagSpecification.0.Tags.2.Value"), Some("infra"));
    }

    #[test]
    fn test_image_change_folds_login_into_reinstall() {
        let kind = InstanceKind::new(CvmService::new(crate::client::TencentCloudClient::new(
            std::sync::Arc::new(NoTransport),
        )));
        let mut new = spec();
        new.image_id = "img-next".to_string();
        new.instance_name = "web-1".to_string();
        new.key_name = Some("skey-2".to_string());
        new.password = Some("Passw0rd!".to_string());
        new.security_groups.insert("sg-1".to_string());

        let changes: Vec<FieldChange> = [
            "image_id",
            "instance_name",
            "key_name",
            "password",
            "security_groups",
        ]
        .into_iter()
        .map(change)
        .collect();

        let steps = kind.plan_update(&changes, &spec(), &new).unwrap();
        assert_eq!(
            steps,
            vec![
                InstanceStep::Rename("web-1".to_string()),
                InstanceStep::SetSecurityGroups(vec!["sg-1".to_string()]),
                InstanceStep::Reinstall {
                    image_id: "img-next".to_string(),
                    password: Some("Passw0rd!".to_string()),
                    key_name: Some("skey-2".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_empty_security_groups_rejected() {
        let kind = InstanceKind::new(CvmService::new(crate::client::TencentCloudClient::new(
            std::sync::Arc::new(NoTransport),
        )));
        let err = kind
            .plan_update(&[change("security_groups")], &spec(), &spec())
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    /// Transport for planning-only tests; never reached
    struct NoTransport;

    #[async_trait]
    impl crate::client::Transport for NoTransport {
        async fn send(&self, _service: &str, request: &ApiRequest) -> Result<String> {
            Err(CloudError::Transport(format!("unexpected call to {}", request.action())))
        }
    }
}
