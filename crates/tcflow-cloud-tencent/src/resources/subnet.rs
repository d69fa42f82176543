use super::AVAILABLE;
use crate::codes;
use crate::vpc::{SubnetInfo, SubnetQuery, VpcService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tcflow_cloud::{
    Capabilities, CloudError, FieldChange, ResourceKind, Result, RetryPolicy, UpdatePhase,
    UpdateStep,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetSpec {
    pub vpc_id: String,
    pub name: String,
    pub cidr_block: String,
    pub availability_zone: String,
    #[serde(default = "super::default_true")]
    pub is_multicast: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_table_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubnetStep {
    ModifyAttributes { name: String, is_multicast: bool },
    AssociateRouteTable(String),
}

impl UpdateStep for SubnetStep {
    fn phase(&self) -> UpdatePhase {
        UpdatePhase::InPlace
    }
}

pub struct SubnetKind {
    service: VpcService,
    caps: Capabilities,
}

impl SubnetKind {
    pub fn new(service: VpcService) -> Self {
        Self {
            service,
            caps: Capabilities::new("subnet")
                .unsupported_updates(&["vpc_id", "cidr_block", "availability_zone"])
                .ready_on(&[AVAILABLE])
                .retry_delete_on(
                    &[codes::RESOURCE_IN_USE],
                    RetryPolicy::new(Duration::from_secs(60)),
                ),
        }
    }
}

#[async_trait]
impl ResourceKind for SubnetKind {
    type Spec = SubnetSpec;
    type Observed = SubnetInfo;
    type Step = SubnetStep;

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn create(&self, spec: &SubnetSpec) -> Result<String> {
        self.service
            .create_subnet(
                &spec.vpc_id,
                &spec.name,
                &spec.cidr_block,
                &spec.availability_zone,
            )
            .await
    }

    // CreateSubnet leaves multicast on and the VPC default route table
    fn as_created(&self, spec: &SubnetSpec) -> Option<SubnetSpec> {
        (!spec.is_multicast || spec.route_table_id.is_some()).then(|| SubnetSpec {
            is_multicast: true,
            route_table_id: None,
            ..spec.clone()
        })
    }

    async fn statuses(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let found = self
            .service
            .describe_subnets(&SubnetQuery {
                subnet_ids: ids,
                ..Default::default()
            })
            .await?;
        Ok(found
            .into_iter()
            .map(|s| (s.subnet_id, AVAILABLE.to_string()))
            .collect())
    }

    async fn describe(&self, id: &str) -> Result<Option<SubnetInfo>> {
        self.service.describe_subnet(id).await
    }

    fn plan_update(
        &self,
        changes: &[FieldChange],
        _old: &SubnetSpec,
        new: &SubnetSpec,
    ) -> Result<Vec<SubnetStep>> {
        let changed = |field: &str| changes.iter().any(|c| c.field == field);
        let mut steps = Vec::new();

        if changed("name") || changed("is_multicast") {
            steps.push(SubnetStep::ModifyAttributes {
                name: new.name.clone(),
                is_multicast: new.is_multicast,
            });
        }
        if changed("route_table_id") {
            let route_table_id = new.route_table_id.clone().ok_or_else(|| {
                CloudError::InvalidConfig(
                    "subnet route_table_id can be replaced but not removed".to_string(),
                )
            })?;
            steps.push(SubnetStep::AssociateRouteTable(route_table_id));
        }
        Ok(steps)
    }

    async fn apply_step(&self, id: &str, step: &SubnetStep) -> Result<()> {
        match step {
            SubnetStep::ModifyAttributes { name, is_multicast } => {
                self.service
                    .modify_subnet_attribute(id, name, *is_multicast)
                    .await
            }
            SubnetStep::AssociateRouteTable(route_table_id) => {
                self.service
                    .replace_route_table_association(id, route_table_id)
                    .await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.service.delete_subnet(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiRequest, TencentCloudClient, Transport};
    use std::sync::Arc;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn send(&self, _service: &str, request: &ApiRequest) -> Result<String> {
            Err(CloudError::Transport(format!("unexpected call to {}", request.action())))
        }
    }

    fn kind() -> SubnetKind {
        SubnetKind::new(VpcService::new(TencentCloudClient::new(Arc::new(NoTransport))))
    }

    fn subnet(route_table_id: Option<&str>) -> SubnetSpec {
        SubnetSpec {
            vpc_id: "vpc-1".to_string(),
            name: "app".to_string(),
            cidr_block: "10.0.1.0/24".to_string(),
            availability_zone: "ap-guangzhou-3".to_string(),
            is_multicast: true,
            route_table_id: route_table_id.map(str::to_string),
        }
    }

    fn plan(old: &SubnetSpec, new: &SubnetSpec) -> Result<Vec<SubnetStep>> {
        let changes = tcflow_cloud::changed_fields(old, new)?;
        kind().plan_update(&changes, old, new)
    }

    #[test]
    fn test_multicast_defaults_on() {
        let spec: SubnetSpec = serde_json::from_value(serde_json::json!({
            "vpc_id": "vpc-1",
            "name": "app",
            "cidr_block": "10.0.1.0/24",
            "availability_zone": "ap-guangzhou-3"
        }))
        .unwrap();
        assert!(spec.is_multicast);
        assert_eq!(spec.route_table_id, None);
    }

    #[test]
    fn test_rename_and_reassociate() {
        let mut new = subnet(Some("rtb-2"));
        new.name = "app-2".to_string();

        let steps = plan(&subnet(Some("rtb-1")), &new).unwrap();
        assert_eq!(
            steps,
            vec![
                SubnetStep::ModifyAttributes {
                    name: "app-2".to_string(),
                    is_multicast: true,
                },
                SubnetStep::AssociateRouteTable("rtb-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_route_table_cannot_be_dropped() {
        let err = plan(&subnet(Some("rtb-1")), &subnet(None)).unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    #[test]
    fn test_follow_ups_after_create() {
        assert_eq!(kind().as_created(&subnet(None)), None);

        let mut declared = subnet(Some("rtb-1"));
        declared.is_multicast = false;
        let created = kind().as_created(&declared).unwrap();
        assert!(created.is_multicast);
        assert_eq!(created.route_table_id, None);

        assert_eq!(
            plan(&created, &declared).unwrap(),
            vec![
                SubnetStep::ModifyAttributes {
                    name: "app".to_string(),
                    is_multicast: false,
                },
                SubnetStep::AssociateRouteTable("rtb-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_cidr_is_fixed() {
        assert!(!kind().capabilities().supports_update_of("cidr_block"));
        assert!(kind().capabilities().supports_update_of("route_table_id"));
    }
}
