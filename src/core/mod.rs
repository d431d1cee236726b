pub mod job_service;
pub mod records;
pub mod report;
pub mod runner;

pub use crate::domain::model::Record;
pub use crate::domain::ports::{BulkApi, Storage};
pub use crate::utils::error::Result;
