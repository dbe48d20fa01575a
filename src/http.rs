//! HTTP boundary for the rate-limited HubSpot routes.
//!
//! A rate-limit error escaping a handler is rendered as HTTP 429 with a
//! `Retry-After` header and a machine-readable JSON body; everything else
//! surfaces as a 500 with the error message.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::error::Error;
use crate::hubspot::{Contact, HttpTransport, HubSpotClient, NewTask, Task};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<HubSpotClient<HttpTransport>>,
}

/// Build the service router.
pub fn router(client: Arc<HubSpotClient<HttpTransport>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/hubspot/contacts", get(list_contacts))
        .route("/api/hubspot/tasks", post(create_task))
        .with_state(AppState { client })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct ContactsQuery {
    #[serde(default = "default_contacts_limit")]
    limit: u32,
}

fn default_contacts_limit() -> u32 {
    100
}

// The route contract is a bare contact array, not HubSpot's raw
// `{results: [...]}` page.
async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ContactsQuery>,
) -> Result<Json<Vec<Contact>>, Error> {
    let page = state.client.list_contacts(query.limit).await?;
    Ok(Json(page.results))
}

async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<NewTask>,
) -> Result<Json<Task>, Error> {
    let task = state.client.create_task(input).await?;
    Ok(Json(task))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::RateLimited {
                message,
                retry_after,
                integration_id,
            } => {
                let body = Json(json!({
                    "error": "Rate limit exceeded",
                    "message": message,
                    "retryAfter": retry_after,
                    "integrationId": integration_id,
                    "timestamp": Utc::now().to_rfc3339(),
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    response.headers_mut().insert(RETRY_AFTER, value);
                }
                response
            }
            other => {
                error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_error_renders_429_with_retry_after() {
        let err = Error::rate_limited("rate limit exceeded for hubspot", 42, "hubspot");
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER),
            Some(&HeaderValue::from_static("42"))
        );
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn test_other_errors_render_500_without_retry_after() {
        let err = Error::NotRegistered("hubspot".to_string());
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(RETRY_AFTER).is_none());
    }

    #[test]
    fn test_contacts_query_default_limit() {
        let query: ContactsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn test_contacts_render_as_bare_array() {
        let contacts = vec![Contact {
            id: "1".to_string(),
            properties: Default::default(),
        }];

        let value = serde_json::to_value(&contacts).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["id"], "1");
        assert!(value.get("results").is_none());
    }
}
