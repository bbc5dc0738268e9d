pub mod engine;
pub mod manifest;
pub mod metrics;
pub mod policy;
pub mod reconcile;
pub mod snapshot;
pub mod status;
pub mod table;

pub use crate::domain::model::{FunctionMeta, ManifestEntry, Operation, ScannedFunction};
pub use crate::domain::ports::{CloudProvider, ConfigProvider, Storage};
pub use crate::utils::error::Result;
