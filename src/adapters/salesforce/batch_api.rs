//! Batch endpoints under `/job/{jobId}/batch`.

use tracing::info;

use crate::adapters::salesforce::client::SalesforceClient;
use crate::domain::model::{BatchInfo, BatchInfoList, BatchResult, JobInfo};
use crate::utils::error::Result;
use crate::utils::logger::redact_id;

pub async fn add_to_job(client: &SalesforceClient, job: &JobInfo, payload: String) -> Result<BatchInfo> {
    info!(
        "[BULK] POST /job/{}/batch ({} bytes)",
        redact_id(&job.id),
        payload.len()
    );
    let batch: BatchInfo = client
        .post_json(&format!("job/{}/batch", job.id), payload)
        .await?;
    info!("[BULK] batch {} is {:?}", redact_id(&batch.id), batch.state);
    Ok(batch)
}

pub async fn info_for_all_in_job(client: &SalesforceClient, job: &JobInfo) -> Result<Vec<BatchInfo>> {
    let list: BatchInfoList = client.get_json(&format!("job/{}/batch", job.id)).await?;
    Ok(list.batch_info)
}

pub async fn results(client: &SalesforceClient, batch: &BatchInfo) -> Result<Vec<BatchResult>> {
    info!(
        "[BULK] GET /job/{}/batch/{}/result",
        redact_id(&batch.job_id),
        redact_id(&batch.id)
    );
    client
        .get_json(&format!("job/{}/batch/{}/result", batch.job_id, batch.id))
        .await
}
