use super::AVAILABLE;
use crate::codes;
use crate::vpc::{RouteTableInfo, VpcService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tcflow_cloud::{
    Capabilities, FieldChange, Filter, ResourceKind, Result, RetryPolicy, UpdatePhase, UpdateStep,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTableSpec {
    pub vpc_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteTableStep {
    Rename(String),
}

impl UpdateStep for RouteTableStep {
    fn phase(&self) -> UpdatePhase {
        UpdatePhase::InPlace
    }
}

pub struct RouteTableKind {
    service: VpcService,
    caps: Capabilities,
}

impl RouteTableKind {
    pub fn new(service: VpcService) -> Self {
        Self {
            service,
            caps: Capabilities::new("route_table")
                .unsupported_updates(&["vpc_id"])
                .ready_on(&[AVAILABLE])
                .retry_delete_on(
                    &[codes::RESOURCE_IN_USE],
                    RetryPolicy::new(Duration::from_secs(60)),
                ),
        }
    }
}

#[async_trait]
impl ResourceKind for RouteTableKind {
    type Spec = RouteTableSpec;
    type Observed = RouteTableInfo;
    type Step = RouteTableStep;

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn create(&self, spec: &RouteTableSpec) -> Result<String> {
        self.service
            .create_route_table(&spec.vpc_id, &spec.name)
            .await
    }

    async fn statuses(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let found = self
            .service
            .describe_route_tables(&[Filter::with_values("route-table-id", ids)])
            .await?;
        Ok(found
            .into_iter()
            .map(|t| (t.route_table_id, AVAILABLE.to_string()))
            .collect())
    }

    async fn describe(&self, id: &str) -> Result<Option<RouteTableInfo>> {
        self.service.describe_route_table(id).await
    }

    fn plan_update(
        &self,
        changes: &[FieldChange],
        _old: &RouteTableSpec,
        new: &RouteTableSpec,
    ) -> Result<Vec<RouteTableStep>> {
        Ok(changes
            .iter()
            .filter(|c| c.field == "name")
            .map(|_| RouteTableStep::Rename(new.name.clone()))
            .collect())
    }

    async fn apply_step(&self, id: &str, step: &RouteTableStep) -> Result<()> {
        match step {
            RouteTableStep::Rename(name) => {
                self.service.modify_route_table_attribute(id, name).await
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.service.delete_route_table(id).await
    }
}
