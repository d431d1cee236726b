//! Job endpoints: `/job` and `/job/{jobId}`.

use serde_json::json;
use tracing::info;

use crate::adapters::salesforce::client::SalesforceClient;
use crate::domain::model::{CreateJobDto, JobInfo};
use crate::utils::error::Result;
use crate::utils::logger::redact_id;

pub async fn create(client: &SalesforceClient, dto: &CreateJobDto) -> Result<JobInfo> {
    info!(
        "[BULK] POST /job (creating {:?} job for {})",
        dto.operation, dto.object
    );
    let body = serde_json::to_string(dto)?;
    let job: JobInfo = client.post_json("job", body).await?;
    info!("[BULK] job {} is {:?}", redact_id(&job.id), job.state);
    Ok(job)
}

pub async fn close(client: &SalesforceClient, job: &JobInfo) -> Result<JobInfo> {
    set_state(client, job, "Closed").await
}

pub async fn abort(client: &SalesforceClient, job: &JobInfo) -> Result<JobInfo> {
    set_state(client, job, "Aborted").await
}

pub async fn info(client: &SalesforceClient, job_id: &str) -> Result<JobInfo> {
    client.get_json(&format!("job/{}", job_id)).await
}

async fn set_state(client: &SalesforceClient, job: &JobInfo, state: &str) -> Result<JobInfo> {
    info!("[BULK] POST /job/{} (state -> {})", redact_id(&job.id), state);
    let body = json!({ "state": state }).to_string();
    client.post_json(&format!("job/{}", job.id), body).await
}
