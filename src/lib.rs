//! Debug - a Terraform provider for exercising failure and load conditions.
//!
//! Resources and data sources that sleep, fail, burn CPU, exhaust memory,
//! run commands and probe the network, plus a small local host for driving
//! them without Terraform.

pub mod cli;
pub mod context;
pub mod data_sources;
pub mod duration;
pub mod error;
pub mod host;
pub mod output;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod terraform;

pub use context::{CancelHandle, Context};
pub use error::DebugError;
pub use provider::{DataSource, DebugProvider, Diagnostic, ProviderError, Resource, Response};
pub use schema::Schema;
pub use terraform::TerraformState;
