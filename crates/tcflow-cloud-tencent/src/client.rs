//! Tencent Cloud API client
//!
//! Requests are flat key/value forms (`Filters.0.Name`, `DataDisks.1.DiskSize`)
//! posted to `https://<service>.tencentcloudapi.com/` and signed with the
//! HmacSHA256 query signature. Every response is wrapped in
//! `{"Response": {...}}`; a present `Error` object turns into
//! [`CloudError::Vendor`].

use crate::config::Credentials;
use crate::error::TencentError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::Arc;
use tcflow_cloud::{CloudError, Filter, PageCursor, Result};

/// API version shared by the CVM and VPC services
pub const API_VERSION: &str = "2017-03-12";

const ENDPOINT_DOMAIN: &str = "tencentcloudapi.com";
const SIGNATURE_METHOD: &str = "HmacSHA256";

type HmacSha256 = Hmac<Sha256>;

/// One API action with its flattened parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    action: String,
    version: String,
    params: BTreeMap<String, String>,
}

impl ApiRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            version: API_VERSION.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn opt_param<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Boolean in the vendor's upper-case form
    pub fn flag(self, key: impl Into<String>, value: bool) -> Self {
        self.param(key, if value { "TRUE" } else { "FALSE" })
    }

    /// `prefix.0`, `prefix.1`, ...
    pub fn list<I, V>(mut self, prefix: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.params
                .insert(format!("{}.{}", prefix, i), value.to_string());
        }
        self
    }

    /// `Filters.N.Name` / `Filters.N.Values.M`
    pub fn filters(mut self, filters: &[Filter]) -> Self {
        for (i, filter) in filters.iter().enumerate() {
            self = self
                .param(format!("Filters.{}.Name", i), &filter.name)
                .list(&format!("Filters.{}.Values", i), &filter.values);
        }
        self
    }

    pub fn page(self, cursor: PageCursor) -> Self {
        self.param("Offset", cursor.offset)
            .param("Limit", cursor.limit)
    }

    /// Parameters as JSON for logs, with passwords masked
    pub fn to_json_string(&self) -> String {
        let masked: BTreeMap<&str, &str> = self
            .params
            .iter()
            .map(|(k, v)| {
                if k.contains("Password") {
                    (k.as_str(), "******")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        serde_json::to_string(&masked).unwrap_or_default()
    }
}

/// Sends a request to one service and returns the raw response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, service: &str, request: &ApiRequest) -> Result<String>;
}

/// Signature over the sorted parameter string, base64 encoded
pub fn sign(
    secret_key: &str,
    host: &str,
    params: &BTreeMap<String, String>,
) -> std::result::Result<String, TencentError> {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let plain = format!("POST{}/?{}", host, query);

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| TencentError::Signing(e.to_string()))?;
    mac.update(plain.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// HTTPS transport signing every request with the account's secret pair
pub struct HttpTransport {
    http: reqwest::Client,
    credentials: Credentials,
    domain: String,
}

impl HttpTransport {
    pub fn new(credentials: Credentials) -> std::result::Result<Self, TencentError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            credentials,
            domain: ENDPOINT_DOMAIN.to_string(),
        })
    }

    pub fn region(&self) -> &str {
        &self.credentials.region
    }

    fn signed_params(
        &self,
        host: &str,
        request: &ApiRequest,
    ) -> std::result::Result<BTreeMap<String, String>, TencentError> {
        let now = Utc::now();
        let mut params = request.params().clone();
        params.insert("Action".to_string(), request.action().to_string());
        params.insert("Version".to_string(), request.version().to_string());
        params.insert("Region".to_string(), self.credentials.region.clone());
        params.insert("Timestamp".to_string(), now.timestamp().to_string());
        params.insert(
            "Nonce".to_string(),
            (now.timestamp_subsec_nanos() % 100_000 + 1).to_string(),
        );
        params.insert("SecretId".to_string(), self.credentials.secret_id.clone());
        params.insert("SignatureMethod".to_string(), SIGNATURE_METHOD.to_string());

        let signature = sign(&self.credentials.secret_key, host, &params)?;
        params.insert("Signature".to_string(), signature);
        Ok(params)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, service: &str, request: &ApiRequest) -> Result<String> {
        let host = format!("{}.{}", service, self.domain);
        let params = self.signed_params(&host, request)?;

        let response = self
            .http
            .post(format!("https://{}/", host))
            .form(&params)
            .send()
            .await
            .map_err(TencentError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(TencentError::from)?;
        if !status.is_success() {
            return Err(CloudError::Transport(format!(
                "{} returned HTTP {}: {}",
                host, status, body
            )));
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Response")]
    response: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Response carrying nothing but its request id
#[derive(Debug, Deserialize)]
pub struct Ack {
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
}

/// Unwrap the response envelope into `T`, or the vendor error it carries
pub fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| CloudError::Inconsistency(format!("malformed API response: {}", e)))?;

    if let Some(error) = envelope.response.get("Error") {
        let error: ApiError = serde_json::from_value(error.clone())
            .map_err(|e| CloudError::Inconsistency(format!("malformed API error: {}", e)))?;
        if !error.code.is_empty() {
            let request_id = envelope
                .response
                .get("RequestId")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            return Err(CloudError::vendor(error.code, error.message, request_id));
        }
    }

    serde_json::from_value(envelope.response)
        .map_err(|e| CloudError::Inconsistency(format!("unexpected API response: {}", e)))
}

/// Shared handle to a transport; cheap to clone into every service
#[derive(Clone)]
pub struct TencentCloudClient {
    transport: Arc<dyn Transport>,
}

impl TencentCloudClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_credentials(credentials: Credentials) -> std::result::Result<Self, TencentError> {
        Ok(Self::new(Arc::new(HttpTransport::new(credentials)?)))
    }

    /// Send `request` to `service` and decode the response
    pub async fn call<T: DeserializeOwned>(&self, service: &str, request: &ApiRequest) -> Result<T> {
        let result = match self.transport.send(service, request).await {
            Ok(body) => {
                tracing::debug!(
                    "api[{}] request body [{}], response body [{}]",
                    request.action(),
                    request.to_json_string(),
                    body
                );
                parse_response(&body)
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::error!(
                "api[{}] fail, request body [{}], reason [{}]",
                request.action(),
                request.to_json_string(),
                e
            );
        }
        result
    }
}
