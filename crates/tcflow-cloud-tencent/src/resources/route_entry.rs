//! Single route inside a route table
//!
//! The vendor has no route identifier of its own; an entry is addressed as
//! `"<route_table_id>.<route_id>"`.

use super::{AVAILABLE, Observed};
use crate::vpc::{RouteSpec, VpcService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tcflow_cloud::{
    Capabilities, CloudError, FieldChange, Identified, ResourceKind, ResourceStatus, Result,
    RetryPolicy, UpdatePhase, UpdateStep,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntrySpec {
    pub route_table_id: String,
    pub destination_cidr_block: String,
    pub next_type: String,
    pub next_hub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RouteEntrySpec {
    fn route(&self) -> RouteSpec<'_> {
        RouteSpec {
            destination_cidr_block: &self.destination_cidr_block,
            next_type: &self.next_type,
            next_hub: &self.next_hub,
            description: self.description.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntryInfo {
    pub route_entry_id: String,
    pub route_table_id: String,
    pub route_id: i64,
    pub destination_cidr_block: String,
    pub next_type: String,
    pub next_hub: String,
    pub description: String,
    pub entry_type: String,
}

impl Identified for RouteEntryInfo {
    fn identifier(&self) -> &str {
        &self.route_entry_id
    }
}

impl Observed for RouteEntryInfo {
    fn status(&self) -> ResourceStatus {
        ResourceStatus::Available
    }
}

/// Route entries cannot be modified; no step is ever planned
#[derive(Debug, Clone, PartialEq)]
pub enum RouteEntryStep {}

impl UpdateStep for RouteEntryStep {
    fn phase(&self) -> UpdatePhase {
        match *self {}
    }
}

pub fn entry_id(route_table_id: &str, route_id: i64) -> String {
    format!("{}.{}", route_table_id, route_id)
}

pub fn parse_entry_id(id: &str) -> Result<(&str, i64)> {
    id.split_once('.')
        .and_then(|(table, route)| {
            let route_id = route.parse::<i64>().ok()?;
            (!table.is_empty()).then_some((table, route_id))
        })
        .ok_or_else(|| {
            CloudError::InvalidConfig(format!(
                "route entry id [{}] is not <route_table_id>.<route_id>",
                id
            ))
        })
}

pub struct RouteEntryKind {
    service: VpcService,
    caps: Capabilities,
    /// Bound on waiting for a new route to show up in its table
    locate_retry: RetryPolicy,
}

impl RouteEntryKind {
    pub fn new(service: VpcService) -> Self {
        Self {
            service,
            caps: Capabilities::new("route_entry")
                .unsupported_updates(&[
                    "route_table_id",
                    "destination_cidr_block",
                    "next_type",
                    "next_hub",
                    "description",
                ])
                .ready_on(&[AVAILABLE]),
            // three lookups: immediately, after 3s, after 5s more
            locate_retry: RetryPolicy::new(Duration::from_secs(8))
                .with_delay(Duration::from_secs(3))
                .with_backoff(5.0 / 3.0, Duration::from_secs(5)),
        }
    }

    async fn lookup(&self, id: &str) -> Result<Option<RouteEntryInfo>> {
        let (table_id, route_id) = parse_entry_id(id)?;
        let Some(table) = self.service.describe_route_table(table_id).await? else {
            return Ok(None);
        };
        Ok(table
            .routes
            .into_iter()
            .find(|r| r.route_id == route_id)
            .map(|r| RouteEntryInfo {
                route_entry_id: id.to_string(),
                route_table_id: table.route_table_id.clone(),
                route_id: r.route_id,
                destination_cidr_block: r.destination_cidr_block,
                next_type: r.next_type,
                next_hub: r.next_hub,
                description: r.description,
                entry_type: r.entry_type,
            }))
    }
}

#[async_trait]
impl ResourceKind for RouteEntryKind {
    type Spec = RouteEntrySpec;
    type Observed = RouteEntryInfo;
    type Step = RouteEntryStep;

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn create(&self, spec: &RouteEntrySpec) -> Result<String> {
        let route = spec.route();
        self.service
            .create_route(&spec.route_table_id, &route)
            .await?;

        let route_id = self
            .locate_retry
            .run_classified(
                &format!("locating new route in {}", spec.route_table_id),
                |e| matches!(e, CloudError::ResourceNotFound(_)),
                || self.service.find_route_id(&spec.route_table_id, &route),
            )
            .await?;
        Ok(entry_id(&spec.route_table_id, route_id))
    }

    async fn statuses(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let mut statuses = HashMap::new();
        for id in ids {
            if self.lookup(id).await?.is_some() {
                statuses.insert(id.clone(), AVAILABLE.to_string());
            }
        }
        Ok(statuses)
    }

    async fn describe(&self, id: &str) -> Result<Option<RouteEntryInfo>> {
        self.lookup(id).await
    }

    fn plan_update(
        &self,
        _changes: &[FieldChange],
        _old: &RouteEntrySpec,
        _new: &RouteEntrySpec,
    ) -> Result<Vec<RouteEntryStep>> {
        Ok(Vec::new())
    }

    async fn apply_step(&self, _id: &str, step: &RouteEntryStep) -> Result<()> {
        match *step {}
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (table_id, route_id) = parse_entry_id(id)?;
        self.service.delete_route(table_id, route_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_round_trip() {
        let id = entry_id("rtb-abc", 42);
        assert_eq!(id, "rtb-abc.42");
        assert_eq!(parse_entry_id(&id).unwrap(), ("rtb-abc", 42));
    }

    #[test]
    fn test_malformed_entry_ids() {
        for bad in ["rtb-abc", "rtb-abc.x", ".42", ""] {
            assert!(parse_entry_id(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
