use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tcflow_cloud::{CloudError, Result};
use tcflow_cloud_tencent::{ApiRequest, TencentCloudClient, TencentCloudProvider, Transport};

/// In-memory API: canned responses per action, every request recorded.
///
/// Responses queued for an action are served in order; the last one keeps
/// being served once the others are used up.
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<String>>>,
    requests: Mutex<Vec<(String, ApiRequest)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, action: &str, mut body: Value) {
        body["RequestId"] = json!(format!("req-{}", action));
        let envelope = json!({ "Response": body }).to_string();
        self.responses
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(envelope);
    }

    pub fn respond(&self, action: &str, body: Value) {
        self.push(action, body);
    }

    #[allow(dead_code)]
    pub fn ack(&self, action: &str) {
        self.push(action, json!({}));
    }

    #[allow(dead_code)]
    pub fn fail(&self, action: &str, code: &str, message: &str) {
        self.push(
            action,
            json!({ "Error": { "Code": code, "Message": message } }),
        );
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    #[allow(dead_code)]
    pub fn actions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.action().to_string())
            .collect()
    }

    #[allow(dead_code)]
    pub fn services(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }

    #[allow(dead_code)]
    pub fn count(&self, action: &str) -> usize {
        self.actions().iter().filter(|a| *a == action).count()
    }

    #[allow(dead_code)]
    pub fn last(&self, action: &str) -> Option<ApiRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.action() == action)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, service: &str, request: &ApiRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((service.to_string(), request.clone()));

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(request.action()).ok_or_else(|| {
            CloudError::Transport(format!("no response queued for {}", request.action()))
        })?;
        let body = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        body.ok_or_else(|| {
            CloudError::Transport(format!("no response queued for {}", request.action()))
        })
    }
}

pub fn provider(mock: &Arc<MockTransport>) -> TencentCloudProvider {
    TencentCloudProvider::with_client(TencentCloudClient::new(mock.clone()), "ap-guangzhou")
}

#[allow(dead_code)]
pub fn vpc_set(vpcs: &[(&str, &str, &str)], total: u64) -> Value {
    let set: Vec<Value> = vpcs
        .iter()
        .map(|(id, name, cidr)| {
            json!({
                "VpcId": id,
                "VpcName": name,
                "CidrBlock": cidr,
                "EnableMulticast": true,
                "IsDefault": false,
                "DnsServerSet": ["183.60.83.19", "183.60.82.98"],
                "CreatedTime": "2026-01-01 00:00:00"
            })
        })
        .collect();
    json!({ "TotalCount": total, "VpcSet": set })
}

#[allow(dead_code)]
pub fn instance_set(id: &str, name: &str, image: &str, state: &str) -> Value {
    json!({
        "TotalCount": 1,
        "InstanceSet": [{
            "InstanceId": id,
            "InstanceName": name,
            "InstanceType": "S5.SMALL1",
            "InstanceState": state,
            "ImageId": image,
            "Placement": { "Zone": "ap-guangzhou-3", "ProjectId": 0 },
            "PrivateIpAddresses": ["10.0.1.8"],
            "SystemDisk": { "DiskType": "CLOUD_PREMIUM", "DiskSize": 50 },
            "SecurityGroupIds": ["sg-1"],
            "VirtualPrivateCloud": { "VpcId": "vpc-123", "SubnetId": "subnet-1" }
        }]
    })
}

#[allow(dead_code)]
pub fn instance_status(id: &str, state: &str) -> Value {
    json!({
        "TotalCount": 1,
        "InstanceStatusSet": [{ "InstanceId": id, "InstanceState": state }]
    })
}
