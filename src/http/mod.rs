//! HTTP transport
//!
//! Sends built requests with a timeout and optional client-side pacing.
//! Retries are not done here: the pagination engine owns status handling,
//! including the 429 backoff.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, HttpResponse};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
