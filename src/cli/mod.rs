//! CLI module
//!
//! Command-line interface and HTTP controller.
//!
//! # Commands
//!
//! - `capture` - Extract a request template from a HAR export
//! - `template` - Show the persisted template (credentials masked)
//! - `harvest` - Page through a timeline and export JSONL
//! - `validate` - Check an export file for required fields
//! - `import` - Dry-run import of an export file
//! - `serve` - Start HTTP server mode

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{router, serve, ServerConfig};
