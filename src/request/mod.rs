//! Request builder module
//!
//! Turns a captured template plus per-call overrides (subject, cursor, page
//! size) into a complete read-only request, leaving the template untouched.

mod builder;

pub use builder::{build_request, BuiltRequest, RequestOverrides};

#[cfg(test)]
mod tests;
