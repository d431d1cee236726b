use chrono::Utc;
use tracing::{error, info, warn};

use crate::core::job_service::JobService;
use crate::core::report::{count_failures, RunSummary};
use crate::domain::model::{CreateJobDto, Record};
use crate::domain::ports::{BulkApi, Storage};
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::{validate_range, Validate};

/// Salesforce caps a Bulk API batch at 10,000 records.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Runs a whole job for a set of records and writes the error report.
pub struct BulkRunner<A: BulkApi, S: Storage> {
    service: JobService<A>,
    report_storage: S,
    job: CreateJobDto,
    batch_size: usize,
}

impl<A: BulkApi, S: Storage> BulkRunner<A, S> {
    pub fn new(service: JobService<A>, report_storage: S, job: CreateJobDto, batch_size: usize) -> Self {
        Self {
            service,
            report_storage,
            job,
            batch_size,
        }
    }

    pub fn service(&self) -> &JobService<A> {
        &self.service
    }

    pub async fn run(&mut self, records: Vec<Record>) -> Result<RunSummary> {
        self.job.validate()?;
        validate_range("batch.size", self.batch_size, 1, MAX_BATCH_SIZE)?;
        if records.is_empty() {
            return Err(BulkError::ValidationError {
                message: "No records to submit".to_string(),
            });
        }

        let started_at = Utc::now();
        info!(
            "Submitting {} records to {} in batches of {}",
            records.len(),
            self.job.object,
            self.batch_size
        );

        self.service.init_job(&self.job).await?;

        let mut batches = 0;
        for chunk in records.chunks(self.batch_size) {
            if let Err(e) = self.service.add_batch_to_job(chunk).await {
                error!("Adding batch {} failed: {}", batches + 1, e);
                if let Err(abort_err) = self.service.abort_job().await {
                    warn!("Could not abort job after failure: {}", abort_err);
                }
                return Err(e);
            }
            batches += 1;
        }

        self.service.close_job().await?;
        self.service.waiting_for_complete().await?;
        let errors = self.service.get_errors().await?;
        let (failed_batches, failed_records) = count_failures(&errors);

        let summary = RunSummary {
            job_id: self.service.job_id()?.to_string(),
            object: self.service.job_object()?.to_string(),
            operation: self.job.operation,
            batches,
            records: records.len(),
            failed_batches,
            failed_records,
            started_at,
            finished_at: Utc::now(),
            errors,
        };

        self.write_report(&summary).await?;
        Ok(summary)
    }

    async fn write_report(&self, summary: &RunSummary) -> Result<()> {
        self.report_storage
            .write_file(&summary.json_report_name(), &summary.to_json()?)
            .await?;

        if summary.has_errors() {
            warn!(
                "{} failed batches, {} failed records",
                summary.failed_batches, summary.failed_records
            );
            self.report_storage
                .write_file(&summary.csv_report_name(), &summary.to_csv()?)
                .await?;
        }

        Ok(())
    }
}
