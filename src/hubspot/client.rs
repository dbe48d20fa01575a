//! Rate-limited HubSpot CRM client.
//!
//! Every outbound HubSpot call goes through [`HubSpotClient::execute`]: the
//! governor is consulted before dispatch, response headers are fed back
//! after, and a remote HTTP 429 is translated into the crate's own
//! rate-limit error so call sites see one error shape whether the block was
//! local or remote.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ratelimit::RateLimitHeaders;

use super::limiter::{HubSpotRateLimiter, HUBSPOT_INTEGRATION_ID};

/// HubSpot's public API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

/// Retry hint used when a 429 arrives without a `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// An outbound HubSpot API request, independent of the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path under the API base URL, e.g. `/crm/v3/objects/contacts`.
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }
}

/// A raw HubSpot API response: status, recognized rate-limit headers, and
/// the decoded JSON body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: RateLimitHeaders,
    pub body: Value,
}

/// Dispatch seam for HubSpot API requests.
///
/// The production implementation is [`HttpTransport`]; tests substitute a
/// scripted one. Transports report any HTTP status as a response; only
/// connection-level failures are errors.
#[async_trait]
pub trait HubSpotTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `reqwest`-backed transport using bearer-token authentication.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpTransport {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl HubSpotTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method, &url)
            .bearer_auth(&self.access_token);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = RateLimitHeaders::from_header_map(response.headers());

        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                // Error pages are not always JSON; keep the raw text.
                Err(_) => Value::String(text),
            }
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// One page of CRM contacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsPage {
    pub results: Vec<Contact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub properties: ContactProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactProperties {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Input for creating a CRM task associated with a contact.
///
/// Deserializes from the camelCase body the route's clients send
/// (`contactId`, `subject`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub contact_id: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// A created CRM task as returned by HubSpot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub properties: TaskProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskProperties {
    #[serde(default)]
    pub hs_task_subject: Option<String>,
    #[serde(default)]
    pub hs_task_body: Option<String>,
    #[serde(default)]
    pub hs_task_status: Option<String>,
    #[serde(default)]
    pub hs_task_priority: Option<String>,
    #[serde(default)]
    pub hs_timestamp: Option<String>,
}

// HubSpot-defined association type: task -> contact.
const TASK_TO_CONTACT_ASSOCIATION: u32 = 204;

/// The single choke point for outbound HubSpot CRM calls.
pub struct HubSpotClient<T: HubSpotTransport> {
    transport: T,
    limiter: HubSpotRateLimiter,
}

impl HubSpotClient<HttpTransport> {
    /// Client against the public HubSpot API with the given access token.
    pub fn new(access_token: impl Into<String>, limiter: HubSpotRateLimiter) -> Self {
        Self::with_transport(HttpTransport::new(access_token), limiter)
    }
}

impl<T: HubSpotTransport> HubSpotClient<T> {
    pub fn with_transport(transport: T, limiter: HubSpotRateLimiter) -> Self {
        Self { transport, limiter }
    }

    /// Fetch one page of CRM contacts.
    pub async fn list_contacts(&self, limit: u32) -> Result<ContactsPage> {
        let mut request = ApiRequest::get("/crm/v3/objects/contacts");
        request.query.push(("limit", limit.to_string()));
        request.query.push((
            "properties",
            "email,firstname,lastname,company,phone".to_string(),
        ));
        self.execute(request).await
    }

    /// Create a CRM task associated with a contact.
    pub async fn create_task(&self, task: NewTask) -> Result<Task> {
        let body = json!({
            "properties": {
                "hs_task_subject": task.subject,
                "hs_task_body": task.body,
                "hs_task_status": task.status.unwrap_or_else(|| "NOT_STARTED".to_string()),
                "hs_task_priority": task.priority.unwrap_or_else(|| "HIGH".to_string()),
                "hs_task_type": "TODO",
                "hs_timestamp": Utc::now().to_rfc3339(),
            },
            "associations": [{
                "to": { "id": task.contact_id },
                "types": [{
                    "associationCategory": "HUBSPOT_DEFINED",
                    "associationTypeId": TASK_TO_CONTACT_ASSOCIATION,
                }],
            }],
        });
        self.execute(ApiRequest::post("/crm/v3/objects/tasks", body))
            .await
    }

    /// Check the governor, dispatch, feed headers back, translate 429s.
    async fn execute<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        self.limiter.check_rate_limit()?;

        let response = self.transport.send(request).await?;

        // Server-reported quota headers are authoritative; fold them in
        // whether the call succeeded or not.
        if !response.headers.is_empty() {
            self.limiter.update_from_headers(&response.headers);
        }

        if response.status == 429 {
            let retry_after = response
                .headers
                .retry_after
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(retry_after, "HubSpot reported 429, translating to rate-limit error");
            return Err(Error::rate_limited(
                "HubSpot rate limit exceeded",
                retry_after,
                HUBSPOT_INTEGRATION_ID,
            ));
        }

        if !(200..300).contains(&response.status) {
            debug!(status = response.status, "HubSpot API call failed");
            return Err(Error::Api {
                status: response.status,
                body: response.body.to_string(),
            });
        }

        Ok(serde_json::from_value(response.body)?)
    }
}
