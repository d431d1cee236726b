use crate::utils::error::{BulkError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp layout used by the Bulk API, e.g. `2015-12-15T21:56:43.000+0000`.
const SF_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// A single record submitted in a batch.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Insert,
    Update,
    Upsert,
    Delete,
    HardDelete,
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "upsert" => Ok(Operation::Upsert),
            "delete" => Ok(Operation::Delete),
            "harddelete" => Ok(Operation::HardDelete),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    #[default]
    Json,
    Csv,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    Parallel,
    Serial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Open,
    Closed,
    Aborted,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Queued,
    InProgress,
    Completed,
    Failed,
    NotProcessed,
    #[serde(other)]
    Unknown,
}

impl BatchState {
    /// Salesforce has not finished with the batch yet.
    pub fn is_pending(self) -> bool {
        matches!(self, BatchState::Queued | BatchState::InProgress)
    }
}

/// Body of the create-job request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobDto {
    pub operation: Operation,
    pub object: String,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id_field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_mode: Option<ConcurrencyMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_rule_id: Option<String>,
}

impl CreateJobDto {
    pub fn new(object: impl Into<String>, operation: Operation) -> Self {
        Self {
            operation,
            object: object.into(),
            content_type: ContentType::Json,
            external_id_field_name: None,
            concurrency_mode: None,
            assignment_rule_id: None,
        }
    }

    pub fn with_external_id_field(mut self, field: impl Into<String>) -> Self {
        self.external_id_field_name = Some(field.into());
        self
    }

    pub fn with_concurrency_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = Some(mode);
        self
    }

    pub fn with_assignment_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.assignment_rule_id = Some(rule_id.into());
        self
    }
}

impl Validate for CreateJobDto {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("job.object", &self.object)?;
        match (&self.operation, &self.external_id_field_name) {
            (Operation::Upsert, None) => Err(BulkError::MissingConfigError {
                field: "job.external_id_field".to_string(),
            }),
            (Operation::Upsert, Some(field)) => {
                validate_non_empty_string("job.external_id_field", field)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: String,
    pub object: String,
    pub operation: Operation,
    pub state: JobState,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub concurrency_mode: Option<ConcurrencyMode>,
    #[serde(default)]
    pub external_id_field_name: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub api_version: Option<f64>,
    #[serde(default)]
    pub number_batches_queued: Option<u64>,
    #[serde(default)]
    pub number_batches_in_progress: Option<u64>,
    #[serde(default)]
    pub number_batches_completed: Option<u64>,
    #[serde(default)]
    pub number_batches_failed: Option<u64>,
    #[serde(default)]
    pub number_batches_total: Option<u64>,
    #[serde(default)]
    pub number_records_processed: Option<u64>,
    #[serde(default)]
    pub number_records_failed: Option<u64>,
}

impl JobInfo {
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_sf_datetime(self.created_date.as_deref()?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    pub id: String,
    pub job_id: String,
    pub state: BatchState,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub number_records_processed: Option<u64>,
    #[serde(default)]
    pub number_records_failed: Option<u64>,
}

impl BatchInfo {
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_sf_datetime(self.created_date.as_deref()?)
    }
}

/// Wrapper returned by the batch list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfoList {
    #[serde(default)]
    pub batch_info: Vec<BatchInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultError {
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Outcome of one record, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub errors: Vec<ResultError>,
}

/// Errors collected for one batch. An empty `error_numbers` on a reported
/// batch means the whole batch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchErrors {
    pub batch_info: BatchInfo,
    pub error_numbers: BTreeMap<usize, String>,
}

impl BatchErrors {
    pub fn new(batch_info: BatchInfo) -> Self {
        Self {
            batch_info,
            error_numbers: BTreeMap::new(),
        }
    }

    pub fn add_error(&mut self, record_index: usize, errors_json: String) {
        self.error_numbers.insert(record_index, errors_json);
    }

    pub fn is_batch_failure(&self) -> bool {
        matches!(
            self.batch_info.state,
            BatchState::Failed | BatchState::NotProcessed
        )
    }
}

/// Local view of the job a service is driving.
#[derive(Debug, Clone, Default)]
pub struct SfJob {
    pub job_info: Option<JobInfo>,
    pub batches_info: Vec<BatchInfo>,
}

impl SfJob {
    pub fn new(job_info: JobInfo) -> Self {
        Self {
            job_info: Some(job_info),
            batches_info: Vec::new(),
        }
    }
}

fn parse_sf_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, SF_DATETIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_create_job_dto_wire_format() {
        let dto = CreateJobDto::new("Account", Operation::Upsert).with_external_id_field("Ext_Id__c");
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "operation": "upsert",
                "object": "Account",
                "contentType": "JSON",
                "externalIdFieldName": "Ext_Id__c"
            })
        );
    }

    #[test]
    fn test_upsert_requires_external_id() {
        assert!(CreateJobDto::new("Account", Operation::Upsert).validate().is_err());
        assert!(CreateJobDto::new("Account", Operation::Upsert)
            .with_external_id_field("Ext_Id__c")
            .validate()
            .is_ok());
        assert!(CreateJobDto::new("Account", Operation::Insert).validate().is_ok());
        assert!(CreateJobDto::new("  ", Operation::Insert).validate().is_err());
    }

    #[test]
    fn test_hard_delete_serializes_camel_case() {
        let json = serde_json::to_string(&Operation::HardDelete).unwrap();
        assert_eq!(json, "\"hardDelete\"");
        assert_eq!("HardDelete".parse::<Operation>().unwrap(), Operation::HardDelete);
        assert!("merge".parse::<Operation>().is_err());
    }

    #[test]
    fn test_job_info_from_salesforce_payload() {
        let payload = serde_json::json!({
            "apexProcessingTime": 0,
            "apiActiveProcessingTime": 0,
            "apiVersion": 36.0,
            "assignmentRuleId": null,
            "concurrencyMode": "Parallel",
            "contentType": "JSON",
            "createdById": "005D0000001b0fFIAQ",
            "createdDate": "2015-12-15T21:54:29.000+0000",
            "externalIdFieldName": null,
            "id": "750D00000004SkVIAU",
            "numberBatchesCompleted": 0,
            "numberBatchesFailed": 0,
            "numberBatchesInProgress": 0,
            "numberBatchesQueued": 0,
            "numberBatchesTotal": 0,
            "numberRecordsFailed": 0,
            "numberRecordsProcessed": 0,
            "numberRetries": 0,
            "object": "Account",
            "operation": "insert",
            "state": "Open",
            "systemModstamp": "2015-12-15T21:54:29.000+0000",
            "totalProcessingTime": 0
        });

        let info: JobInfo = serde_json::from_value(payload).unwrap();
        assert_eq!(info.id, "750D00000004SkVIAU");
        assert_eq!(info.state, JobState::Open);
        assert_eq!(info.operation, Operation::Insert);
        assert_eq!(info.concurrency_mode, Some(ConcurrencyMode::Parallel));

        let created = info.created_at().unwrap();
        assert_eq!(created.year(), 2015);
        assert_eq!(created.hour(), 21);
    }

    #[test]
    fn test_batch_state_pending() {
        assert!(BatchState::Queued.is_pending());
        assert!(BatchState::InProgress.is_pending());
        assert!(!BatchState::Completed.is_pending());
        assert!(!BatchState::Failed.is_pending());
        assert!(!BatchState::NotProcessed.is_pending());
    }

    #[test]
    fn test_unknown_batch_state_is_tolerated() {
        let info: BatchInfo = serde_json::from_value(serde_json::json!({
            "id": "751D00000004YGZIA2",
            "jobId": "750D00000004SkVIAU",
            "state": "Paused"
        }))
        .unwrap();
        assert_eq!(info.state, BatchState::Unknown);
        assert!(!info.state.is_pending());
    }

    #[test]
    fn test_batch_result_with_errors() {
        let result: BatchResult = serde_json::from_value(serde_json::json!({
            "success": false,
            "created": false,
            "id": null,
            "errors": [{
                "fields": ["Name"],
                "message": "Required fields are missing: [Name]",
                "statusCode": "REQUIRED_FIELD_MISSING"
            }]
        }))
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].status_code, "REQUIRED_FIELD_MISSING");
        assert_eq!(result.errors[0].fields, vec!["Name"]);
    }
}
