//! Auth template capture module
//!
//! Observes outbound requests to the timeline GraphQL operation and keeps the
//! most recent one as a reusable, authenticated request template.
//!
//! # Overview
//!
//! The capture module provides:
//! - `CapturedTemplate` - Method, base URL, headers and decoded GraphQL params
//! - `TemplateStore` - Last-write-wins holder with capture subscriptions
//! - `OperationMatcher` - `.../graphql/<id>/<OperationName>` URL matching
//! - HAR ingestion for feeding browser devtools exports to the store

mod har;
mod store;
mod types;

pub use har::{load_har, load_har_from_str};
pub use store::{OperationMatcher, TemplateStore, DEFAULT_OPERATION};
pub use types::{CaptureNotice, CapturedTemplate, ObservedRequest};

#[cfg(test)]
mod tests;
