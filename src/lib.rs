pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::salesforce::{HttpConfig, LoginParams, SalesforceClient};
pub use adapters::storage::LocalStorage;
pub use config::{Settings, TomlConfig};
pub use crate::core::job_service::{JobService, PollSettings};
pub use crate::core::runner::BulkRunner;
pub use domain::model::{BatchErrors, BatchState, CreateJobDto, JobInfo, Operation};
pub use utils::error::{BulkError, Result};
