//! Outbound requests to third-party APIs.
//!
//! Every call resolves to an [`HttpResponse`]; network failures and non-2xx
//! answers are represented in the same shape instead of being returned as
//! errors.

pub mod client;
pub mod status;

pub use client::{
    HttpMethod, HttpRequestClient, HttpResponse, RequestArgs, RequestBody, DEFAULT_TIMEOUT_SECS,
    USER_AGENT,
};
pub use status::{extract_error, status_description};
