// Adapters: concrete implementations of the domain ports.

pub mod salesforce;
pub mod storage;
