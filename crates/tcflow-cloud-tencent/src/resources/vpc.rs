use super::AVAILABLE;
use crate::codes;
use crate::vpc::{VpcInfo, VpcService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tcflow_cloud::{
    Capabilities, FieldChange, Filter, ResourceKind, Result, RetryPolicy, UpdatePhase, UpdateStep,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VpcSpec {
    pub name: String,
    pub cidr_block: String,
    #[serde(default = "super::default_true")]
    pub is_multicast: bool,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VpcStep {
    /// Name, multicast and DNS servers are written by one call
    ModifyAttributes {
        name: String,
        is_multicast: bool,
        dns_servers: Vec<String>,
    },
}

impl UpdateStep for VpcStep {
    fn phase(&self) -> UpdatePhase {
        UpdatePhase::InPlace
    }
}

pub struct VpcKind {
    service: VpcService,
    caps: Capabilities,
}

impl VpcKind {
    pub fn new(service: VpcService) -> Self {
        Self {
            service,
            caps: Capabilities::new("vpc")
                .unsupported_updates(&["cidr_block"])
                .ready_on(&[AVAILABLE])
                .retry_delete_on(
                    &[codes::RESOURCE_IN_USE],
                    RetryPolicy::new(Duration::from_secs(60)),
                ),
        }
    }
}

#[async_trait]
impl ResourceKind for VpcKind {
    type Spec = VpcSpec;
    type Observed = VpcInfo;
    type Step = VpcStep;

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn create(&self, spec: &VpcSpec) -> Result<String> {
        self.service
            .create_vpc(&spec.name, &spec.cidr_block, spec.is_multicast, &spec.dns_servers)
            .await
    }

    async fn statuses(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let found = self
            .service
            .describe_vpcs(&[Filter::with_values("vpc-id", ids)])
            .await?;
        Ok(found
            .into_iter()
            .map(|v| (v.vpc_id, AVAILABLE.to_string()))
            .collect())
    }

    async fn describe(&self, id: &str) -> Result<Option<VpcInfo>> {
        self.service.describe_vpc(id).await
    }

    fn plan_update(
        &self,
        changes: &[FieldChange],
        _old: &VpcSpec,
        new: &VpcSpec,
    ) -> Result<Vec<VpcStep>> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![VpcStep::ModifyAttributes {
            name: new.name.clone(),
            is_multicast: new.is_multicast,
            dns_servers: new.dns_servers.clone(),
        }])
    }

    async fn apply_step(&self, id: &str, step: &VpcStep) -> Result<()> {
        match step {
            VpcStep::ModifyAttributes {
                name,
                is_multicast,
                dns_servers,
            } => {
                self.service
                    .modify_vpc_attribute(id, name, *is_multicast, dns_servers)
                    .await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.service.delete_vpc(id).await
    }
}
