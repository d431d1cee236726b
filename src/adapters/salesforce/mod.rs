//! Salesforce Bulk API (async API 1.0) over HTTP.
//!
//! - `login`: SOAP partner login or a pre-issued session
//! - `client`: session header, error mapping, retry and re-login
//! - `job_api` / `batch_api`: the individual endpoints

pub mod batch_api;
pub mod client;
pub mod job_api;
pub mod login;

pub use client::{HttpConfig, SalesforceClient};
pub use login::{Credentials, LoginParams, Session};
