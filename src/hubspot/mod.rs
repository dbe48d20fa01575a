//! HubSpot integration: rate limiter façade and rate-limited CRM client.

mod client;
mod limiter;

pub use client::{
    ApiRequest, ApiResponse, Contact, ContactProperties, ContactsPage, HttpTransport,
    HubSpotClient, HubSpotTransport, NewTask, Task, TaskProperties, DEFAULT_BASE_URL,
};
pub use limiter::{HubSpotRateLimiter, HUBSPOT_INTEGRATION_ID};
