mod common;

use common::{MockTransport, instance_set, instance_status, provider, vpc_set};
use serde_json::json;
use tcflow_cloud::{
    ActionType, CloudError, CloudProvider, GlobalState, Plan, ResourceConfig, ResourceSet,
    ResourceState, ResourceStatus, apply_plan,
};

fn instance_config(overrides: serde_json::Value) -> serde_json::Value {
    let mut config = json!({
        "image_id": "img-base",
        "availability_zone": "ap-guangzhou-3",
        "instance_name": "web-0",
        "instance_type": "S5.SMALL1",
        "security_groups": ["sg-1"],
        "key_name": "skey-1",
        "password": "Old-passw0rd"
    });
    if let (Some(base), Some(extra)) = (config.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    config
}

fn instance_state(config: serde_json::Value) -> ResourceState {
    ResourceState::new("ins-1", "instance")
        .with_status(ResourceStatus::Running)
        .with_config(config)
}

#[tokio::test(start_paused = true)]
async fn test_create_vpc_then_read() {
    let mock = MockTransport::new();
    mock.respond("CreateVpc", json!({ "Vpc": { "VpcId": "vpc-123" } }));
    mock.respond("DescribeVpcs", vpc_set(&[("vpc-123", "test-vpc", "10.0.0.0/16")], 1));
    let provider = provider(&mock);

    let declared = ResourceConfig::new(
        "vpc",
        "main",
        json!({ "name": "test-vpc", "cidr_block": "10.0.0.0/16" }),
    );
    let created = provider.create(&declared).await.unwrap();

    assert_eq!(created.id, "vpc-123");
    assert_eq!(created.status, ResourceStatus::Available);
    assert_eq!(created.get_attribute::<String>("name").as_deref(), Some("test-vpc"));

    let request = mock.last("CreateVpc").unwrap();
    assert_eq!(request.get("VpcName"), Some("test-vpc"));
    assert_eq!(request.get("CidrBlock"), Some("10.0.0.0/16"));
    assert_eq!(request.get("EnableMulticast"), Some("true"));
    assert!(mock.services().iter().all(|s| s == "vpc"));

    let read = provider
        .read(&created.with_config(declared.config.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.id, "vpc-123");
    assert_eq!(
        read.get_attribute::<String>("cidr_block").as_deref(),
        Some("10.0.0.0/16")
    );
    assert_eq!(read.config, declared.config);
}

#[tokio::test]
async fn test_read_of_deleted_vpc_is_none() {
    let mock = MockTransport::new();
    mock.respond("DescribeVpcs", vpc_set(&[], 0));

    let gone = provider(&mock)
        .read(&ResourceState::new("vpc-gone", "vpc"))
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_delete_retries_resource_in_use() {
    let mock = MockTransport::new();
    mock.fail("DeleteSubnet", "ResourceInUse", "subnet has instances");
    mock.fail("DeleteSubnet", "ResourceInUse", "subnet has instances");
    mock.ack("DeleteSubnet");

    provider(&mock)
        .destroy(&ResourceState::new("subnet-1", "subnet"))
        .await
        .unwrap();
    assert_eq!(mock.count("DeleteSubnet"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_delete_stops_on_other_vendor_errors() {
    let mock = MockTransport::new();
    mock.fail("DeleteVpc", "UnauthorizedOperation", "denied");

    let err = provider(&mock)
        .destroy(&ResourceState::new("vpc-123", "vpc"))
        .await
        .unwrap_err();
    assert_eq!(err.vendor_code(), Some("UnauthorizedOperation"));
    assert_eq!(mock.count("DeleteVpc"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_gives_up_after_timeout() {
    let mock = MockTransport::new();
    mock.fail("DeleteRouteTable", "ResourceInUse", "still associated");

    let err = provider(&mock)
        .destroy(&ResourceState::new("rtb-1", "route_table"))
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert!(mock.count("DeleteRouteTable") > 1);
}

#[tokio::test(start_paused = true)]
async fn test_instance_create_retries_busy_private_ip() {
    let mock = MockTransport::new();
    mock.fail("RunInstances", "VpcIpIsUsed", "10.0.1.8 is in use");
    mock.respond("RunInstances", json!({ "InstanceIdSet": ["ins-1"] }));
    mock.respond("DescribeInstancesStatus", instance_status("ins-1", "PENDING"));
    mock.respond("DescribeInstancesStatus", instance_status("ins-1", "RUNNING"));
    mock.respond("DescribeInstances", instance_set("ins-1", "web-0", "img-base", "RUNNING"));

    let declared = ResourceConfig::new(
        "instance",
        "web",
        instance_config(json!({ "private_ip": "10.0.1.8", "subnet_id": "subnet-1", "vpc_id": "vpc-123" })),
    );
    let created = provider(&mock).create(&declared).await.unwrap();

    assert_eq!(created.id, "ins-1");
    assert_eq!(created.status, ResourceStatus::Running);
    assert_eq!(mock.count("RunInstances"), 2);
    assert_eq!(mock.count("DescribeInstancesStatus"), 2);

    let run = mock.last("RunInstances").unwrap();
    assert_eq!(run.get("VirtualPrivateCloud.PrivateIpAddresses.0"), Some("10.0.1.8"));
    assert_eq!(run.get("Placement.Zone"), Some("ap-guangzhou-3"));
    assert!(mock.services().iter().all(|s| s == "cvm"));
}

#[tokio::test(start_paused = true)]
async fn test_image_change_reinstalls_last() {
    let mock = MockTransport::new();
    mock.ack("ModifyInstancesAttribute");
    mock.ack("ResetInstance");
    mock.respond("DescribeInstances", instance_set("ins-1", "web-1", "img-next", "RUNNING"));

    let old = instance_config(json!({}));
    let new = instance_config(json!({
        "image_id": "img-next",
        "instance_name": "web-1",
        "security_groups": ["sg-2", "sg-3"],
        "key_name": "skey-2",
        "password": "New-passw0rd"
    }));

    let updated = provider(&mock)
        .update(
            &instance_state(old),
            &ResourceConfig::new("instance", "web", new),
        )
        .await
        .unwrap();
    assert_eq!(updated.get_attribute::<String>("image_id").as_deref(), Some("img-next"));

    assert_eq!(
        mock.actions(),
        vec![
            "ModifyInstancesAttribute",
            "ModifyInstancesAttribute",
            "ResetInstance",
            "DescribeInstances",
        ]
    );
    let requests = mock.requests();
    assert_eq!(requests[0].get("InstanceName"), Some("web-1"));
    assert_eq!(requests[1].get("SecurityGroups.0"), Some("sg-2"));
    assert_eq!(requests[1].get("SecurityGroups.1"), Some("sg-3"));
    assert_eq!(requests[2].get("ImageId"), Some("img-next"));
    assert_eq!(requests[2].get("LoginSettings.Password"), Some("New-passw0rd"));
    assert_eq!(requests[2].get("LoginSettings.KeyIds.0"), Some("skey-2"));
}

#[tokio::test(start_paused = true)]
async fn test_key_pair_change_waits_for_settled_instance() {
    let mock = MockTransport::new();
    mock.respond("DescribeInstancesStatus", instance_status("ins-1", "STOPPING"));
    mock.respond("DescribeInstancesStatus", instance_status("ins-1", "STOPPED"));
    mock.ack("AssociateInstancesKeyPairs");
    mock.ack("ResetInstancesPassword");
    mock.respond("DescribeInstances", instance_set("ins-1", "web-0", "img-base", "STOPPED"));

    let new = instance_config(json!({ "key_name": "skey-2", "password": "New-passw0rd" }));
    let updated = provider(&mock)
        .update(
            &instance_state(instance_config(json!({}))),
            &ResourceConfig::new("instance", "web", new),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ResourceStatus::Stopped);

    assert_eq!(
        mock.actions(),
        vec![
            "DescribeInstancesStatus",
            "DescribeInstancesStatus",
            "AssociateInstancesKeyPairs",
            "ResetInstancesPassword",
            "DescribeInstances",
        ]
    );
    let bind = mock.last("AssociateInstancesKeyPairs").unwrap();
    assert_eq!(bind.get("KeyIds.0"), Some("skey-2"));
    assert_eq!(bind.get("ForceStop"), Some("TRUE"));
}

#[tokio::test]
async fn test_unsupported_update_makes_no_calls() {
    let mock = MockTransport::new();

    let new = instance_config(json!({ "instance_type": "S5.LARGE8", "instance_name": "web-1" }));
    let err = provider(&mock)
        .update(
            &instance_state(instance_config(json!({}))),
            &ResourceConfig::new("instance", "web", new),
        )
        .await
        .unwrap_err();

    match err {
        CloudError::UnsupportedUpdate { kind, field } => {
            assert_eq!(kind, "instance");
            assert_eq!(field, "instance_type");
        }
        other => panic!("expected UnsupportedUpdate, got {other}"),
    }
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_vpc_cidr_change_rejected() {
    let mock = MockTransport::new();
    let state = ResourceState::new("vpc-123", "vpc")
        .with_config(json!({ "name": "test-vpc", "cidr_block": "10.0.0.0/16" }));

    let err = provider(&mock)
        .update(
            &state,
            &ResourceConfig::new(
                "vpc",
                "main",
                json!({ "name": "renamed", "cidr_block": "10.1.0.0/16" }),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::UnsupportedUpdate { .. }));
    assert!(mock.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_route_entry_located_after_listing_catches_up() {
    let table = |routes: serde_json::Value| {
        json!({
            "TotalCount": 1,
            "RouteTableSet": [{
                "RouteTableId": "rtb-1",
                "VpcId": "vpc-123",
                "RouteTableName": "main",
                "RouteSet": routes
            }]
        })
    };
    let route = json!({
        "RouteId": 7,
        "DestinationCidrBlock": "172.16.0.0/16",
        "GatewayType": "NORMAL_CVM",
        "GatewayId": "10.0.1.5",
        "RouteDescription": "to peer",
        "RouteType": "USER"
    });

    let mock = MockTransport::new();
    mock.ack("CreateRoutes");
    mock.respond("DescribeRouteTables", table(json!([])));
    mock.respond("DescribeRouteTables", table(json!([route])));
    mock.ack("DeleteRoutes");
    let provider = provider(&mock);

    let declared = ResourceConfig::new(
        "route_entry",
        "peer",
        json!({
            "route_table_id": "rtb-1",
            "destination_cidr_block": "172.16.0.0/16",
            "next_type": "NORMAL_CVM",
            "next_hub": "10.0.1.5",
            "description": "to peer"
        }),
    );
    let created = provider.create(&declared).await.unwrap();

    assert_eq!(created.id, "rtb-1.7");
    assert_eq!(created.get_attribute::<i64>("route_id"), Some(7));
    let create = mock.last("CreateRoutes").unwrap();
    assert_eq!(create.get("Routes.0.GatewayType"), Some("NORMAL_CVM"));
    assert_eq!(create.get("Routes.0.RouteDescription"), Some("to peer"));

    provider.destroy(&created).await.unwrap();
    let delete = mock.last("DeleteRoutes").unwrap();
    assert_eq!(delete.get("RouteTableId"), Some("rtb-1"));
    assert_eq!(delete.get("Routes.0.RouteId"), Some("7"));
}

#[tokio::test]
async fn test_vpc_listing_includes_subnets() {
    let mock = MockTransport::new();
    mock.respond(
        "DescribeVpcs",
        vpc_set(
            &[
                ("vpc-1", "prod", "10.0.0.0/16"),
                ("vpc-2", "prod", "10.1.0.0/16"),
            ],
            2,
        ),
    );
    mock.respond(
        "DescribeSubnets",
        json!({
            "TotalCount": 2,
            "SubnetSet": [
                { "SubnetId": "subnet-a", "VpcId": "vpc-1" },
                { "SubnetId": "subnet-b", "VpcId": "vpc-1" }
            ]
        }),
    );
    mock.respond("DescribeSubnets", json!({ "TotalCount": 0, "SubnetSet": [] }));

    let vpcs = provider(&mock).vpcs(None, Some("prod")).await.unwrap();

    assert_eq!(vpcs.len(), 2);
    assert_eq!(vpcs[0].vpc.vpc_id, "vpc-1");
    assert_eq!(vpcs[0].subnet_ids, vec!["subnet-a", "subnet-b"]);
    assert!(vpcs[1].subnet_ids.is_empty());

    let list = mock.last("DescribeVpcs").unwrap();
    assert_eq!(list.get("Filters.0.Name"), Some("vpc-name"));
    assert_eq!(list.get("Filters.0.Values.0"), Some("prod"));
    let subnets = mock.last("DescribeSubnets").unwrap();
    assert_eq!(subnets.get("Filters.0.Name"), Some("vpc-id"));
    assert_eq!(subnets.get("Filters.0.Values.0"), Some("vpc-2"));

    let listed = serde_json::to_value(&vpcs[0]).unwrap();
    assert_eq!(listed["vpc_id"], "vpc-1");
    assert_eq!(listed["subnet_ids"][1], "subnet-b");
}

#[tokio::test]
async fn test_listing_drift_is_inconsistency() {
    let mock = MockTransport::new();
    // total claims a second page, which repeats the first
    mock.respond("DescribeVpcs", vpc_set(&[("vpc-1", "prod", "10.0.0.0/16")], 101));

    let err = provider(&mock).vpcs(None, None).await.unwrap_err();
    assert!(matches!(err, CloudError::Inconsistency(_)), "{err}");
    assert_eq!(mock.count("DescribeVpcs"), 2);
    assert_eq!(mock.last("DescribeVpcs").unwrap().get("Offset"), Some("100"));
}

#[tokio::test]
async fn test_check_auth() {
    let mock = MockTransport::new();
    mock.respond("DescribeVpcs", vpc_set(&[], 0));
    let status = provider(&mock).check_auth().await.unwrap();
    assert!(status.authenticated);

    let mock = MockTransport::new();
    mock.fail(
        "DescribeVpcs",
        "AuthFailure.SignatureFailure",
        "The provided credentials could not be validated.",
    );
    let status = provider(&mock).check_auth().await.unwrap();
    assert!(!status.authenticated);
    assert!(status.error.unwrap().contains("AuthFailure.SignatureFailure"));
}

#[tokio::test(start_paused = true)]
async fn test_apply_resolves_references_between_resources() {
    let mock = MockTransport::new();
    mock.respond("CreateVpc", json!({ "Vpc": { "VpcId": "vpc-123" } }));
    mock.respond("DescribeVpcs", vpc_set(&[("vpc-123", "test-vpc", "10.0.0.0/16")], 1));
    mock.respond("CreateSubnet", json!({ "Subnet": { "SubnetId": "subnet-1" } }));
    mock.respond(
        "DescribeSubnets",
        json!({
            "TotalCount": 1,
            "SubnetSet": [{
                "SubnetId": "subnet-1",
                "VpcId": "vpc-123",
                "SubnetName": "app",
                "CidrBlock": "10.0.1.0/24",
                "Zone": "ap-guangzhou-3",
                "EnableBroadcast": true
            }]
        }),
    );
    let provider = provider(&mock);

    let desired = ResourceSet::from_json(
        &json!({
            "resources": [
                {
                    "type": "subnet",
                    "name": "app",
                    "config": {
                        "vpc_id": "${vpc.main.id}",
                        "name": "app",
                        "cidr_block": "10.0.1.0/24",
                        "availability_zone": "ap-guangzhou-3"
                    }
                },
                {
                    "type": "vpc",
                    "name": "main",
                    "config": { "name": "test-vpc", "cidr_block": "10.0.0.0/16" }
                }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let mut state = GlobalState::new();
    let plan = Plan::build(&provider, &desired, &state, false).unwrap();
    assert_eq!(plan.actions[0].id, "vpc:main");
    assert_eq!(plan.actions[1].id, "subnet:app");
    assert!(plan.actions.iter().all(|a| a.action_type == ActionType::Create));

    let result = apply_plan(&provider, &plan, &desired, &mut state).await;
    assert!(result.is_success(), "{:?}", result.failed);

    assert_eq!(mock.last("CreateSubnet").unwrap().get("VpcId"), Some("vpc-123"));
    let subnet = state.get_resource("subnet:app").unwrap();
    assert_eq!(subnet.id, "subnet-1");
    assert_eq!(subnet.config["vpc_id"], "vpc-123");

    // second plan against the recorded state has nothing to do
    let replan = Plan::build(&provider, &desired, &state, false).unwrap();
    assert!(!replan.has_changes);
}

#[tokio::test(start_paused = true)]
async fn test_subnet_kept_in_state_when_follow_up_fails() {
    let mock = MockTransport::new();
    mock.respond("CreateSubnet", json!({ "Subnet": { "SubnetId": "subnet-1" } }));
    mock.respond(
        "DescribeSubnets",
        json!({
            "TotalCount": 1,
            "SubnetSet": [{
                "SubnetId": "subnet-1",
                "VpcId": "vpc-123",
                "SubnetName": "app",
                "CidrBlock": "10.0.1.0/24",
                "Zone": "ap-guangzhou-3",
                "EnableBroadcast": false
            }]
        }),
    );
    mock.fail("ModifySubnetAttribute", "InternalError", "try again later");
    mock.ack("ModifySubnetAttribute");
    let provider = provider(&mock);

    let desired = ResourceSet::from_json(
        &json!({
            "resources": [{
                "type": "subnet",
                "name": "app",
                "config": {
                    "vpc_id": "vpc-123",
                    "name": "app",
                    "cidr_block": "10.0.1.0/24",
                    "availability_zone": "ap-guangzhou-3",
                    "is_multicast": false
                }
            }]
        })
        .to_string(),
    )
    .unwrap();

    let mut state = GlobalState::new();
    let plan = Plan::build(&provider, &desired, &state, false).unwrap();
    let result = apply_plan(&provider, &plan, &desired, &mut state).await;
    assert_eq!(result.failed.len(), 1);
    assert!(result.failed[0].error.as_deref().unwrap().contains("InternalError"));

    let recorded = state.get_resource("subnet:app").unwrap();
    assert_eq!(recorded.id, "subnet-1");
    assert_eq!(recorded.status, ResourceStatus::Error);
    assert_eq!(recorded.config["is_multicast"], true);

    // the next run finishes the subnet instead of creating another one
    let replan = Plan::build(&provider, &desired, &state, false).unwrap();
    assert_eq!(replan.actions[0].action_type, ActionType::Update);
    assert_eq!(replan.actions[0].details["changed"], json!(["is_multicast"]));

    let result = apply_plan(&provider, &replan, &desired, &mut state).await;
    assert!(result.is_success(), "{:?}", result.failed);
    assert_eq!(mock.count("CreateSubnet"), 1);
    assert_eq!(mock.count("ModifySubnetAttribute"), 2);
    assert_eq!(
        mock.last("ModifySubnetAttribute").unwrap().get("EnableBroadcast"),
        Some("false")
    );
    assert_eq!(
        state.get_resource("subnet:app").unwrap().status,
        ResourceStatus::Available
    );
}
