use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::model::{BatchErrors, Operation};
use crate::utils::error::{BulkError, Result};

/// Outcome of one CLI run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub job_id: String,
    pub object: String,
    pub operation: Operation,
    pub batches: usize,
    pub records: usize,
    pub failed_batches: usize,
    pub failed_records: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub errors: Vec<BatchErrors>,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn json_report_name(&self) -> String {
        format!("errors_{}.json", self.job_id)
    }

    pub fn csv_report_name(&self) -> String {
        format!("errors_{}.csv", self.job_id)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// One row per failed record, or per failed batch with an empty index.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["batch_id", "batch_state", "record_index", "errors"])?;

        for batch in &self.errors {
            let state = format!("{:?}", batch.batch_info.state);
            if batch.error_numbers.is_empty() {
                writer.write_record([
                    batch.batch_info.id.as_str(),
                    state.as_str(),
                    "",
                    batch.batch_info.state_message.as_deref().unwrap_or(""),
                ])?;
                continue;
            }
            for (index, errors) in &batch.error_numbers {
                writer.write_record([
                    batch.batch_info.id.as_str(),
                    state.as_str(),
                    index.to_string().as_str(),
                    errors.as_str(),
                ])?;
            }
        }

        writer.into_inner().map_err(|e| BulkError::ProcessingError {
            message: format!("Failed to finish CSV report: {}", e),
        })
    }
}

/// Counts (failed batches, failed records) over collected errors.
pub fn count_failures(errors: &[BatchErrors]) -> (usize, usize) {
    errors.iter().fold((0, 0), |(batches, records), batch| {
        if batch.is_batch_failure() {
            (batches + 1, records)
        } else {
            (batches, records + batch.error_numbers.len())
        }
    })
}
