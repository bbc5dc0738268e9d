pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::AwsProvider;
pub use config::{cli::LocalStorage, CliConfig, RunConfig};
pub use core::engine::{RunReport, RunSummary, SecOpsEngine};
pub use utils::error::{Result, SecOpsError};
