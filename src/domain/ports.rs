use crate::domain::model::{BatchInfo, BatchResult, CreateJobDto, JobInfo};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The Bulk API calls a job service needs. Implemented over HTTP by
/// `SalesforceClient`.
#[async_trait]
pub trait BulkApi: Send + Sync {
    async fn create_job(&self, dto: &CreateJobDto) -> Result<JobInfo>;
    async fn close_job(&self, job: &JobInfo) -> Result<JobInfo>;
    async fn abort_job(&self, job: &JobInfo) -> Result<JobInfo>;
    async fn job_info(&self, job_id: &str) -> Result<JobInfo>;
    /// `payload` is the already encoded JSON array of records.
    async fn add_batch(&self, job: &JobInfo, payload: String) -> Result<BatchInfo>;
    async fn batches_info(&self, job: &JobInfo) -> Result<Vec<BatchInfo>>;
    async fn batch_results(&self, batch: &BatchInfo) -> Result<Vec<BatchResult>>;
}
