//! Quotaguard - Rate-Limit Governor for CRM Integrations
//!
//! This crate implements client-side admission control for third-party API
//! integrations. A shared governor tracks per-integration request quotas
//! over second and day windows, reconciles them against server-reported
//! rate-limit headers, and feeds a uniform rate-limit error to a retry
//! helper and an HTTP 429 boundary.

pub mod config;
pub mod error;
pub mod http;
pub mod hubspot;
pub mod ratelimit;
pub mod retry;
