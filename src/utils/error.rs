use thiserror::Error;

#[derive(Error, Debug)]
pub enum BulkError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Login failed: {message}")]
    LoginFailed { message: String },

    #[error("Session expired or invalid")]
    SessionExpired,

    #[error("Salesforce error [{code}] (HTTP {status}): {message}")]
    SalesforceError {
        code: String,
        message: String,
        status: u16,
    },

    #[error("No active job, call init_job first")]
    NoActiveJob,

    #[error("Batches of job {job_id} still pending after {waited_secs}s")]
    PollTimeout { job_id: String, waited_secs: u64 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Remote,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BulkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BulkError::ApiError(_) => ErrorCategory::Network,
            BulkError::LoginFailed { .. } | BulkError::SessionExpired => {
                ErrorCategory::Authentication
            }
            BulkError::SalesforceError { .. } | BulkError::PollTimeout { .. } => {
                ErrorCategory::Remote
            }
            BulkError::ConfigError { .. }
            | BulkError::MissingConfigError { .. }
            | BulkError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            BulkError::CsvError(_)
            | BulkError::SerializationError(_)
            | BulkError::ValidationError { .. }
            | BulkError::ProcessingError { .. } => ErrorCategory::Data,
            BulkError::IoError(_) | BulkError::NoActiveJob => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BulkError::ApiError(_) | BulkError::PollTimeout { .. } => ErrorSeverity::Medium,
            BulkError::SalesforceError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            BulkError::IoError(_) | BulkError::NoActiveJob => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Transient failures worth another attempt by the HTTP layer.
    pub fn is_retryable(&self) -> bool {
        match self {
            BulkError::ApiError(e) => e.is_timeout() || e.is_connect(),
            BulkError::SalesforceError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity to Salesforce and retry",
            ErrorCategory::Authentication => {
                "Verify username, password and security token, or supply a fresh session id"
            }
            ErrorCategory::Remote => {
                "Inspect the job in Salesforce Setup > Bulk Data Load Jobs and retry if needed"
            }
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::Data => "Check the input file format and record contents",
            ErrorCategory::System => "Check file permissions and program usage",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BulkError::ApiError(_) => "Could not reach Salesforce".to_string(),
            BulkError::LoginFailed { message } => format!("Salesforce login failed: {}", message),
            BulkError::SessionExpired => "The Salesforce session is no longer valid".to_string(),
            BulkError::SalesforceError { code, message, .. } => {
                format!("Salesforce rejected the request ({}): {}", code, message)
            }
            BulkError::PollTimeout { job_id, .. } => {
                format!("Job {} did not finish in time", job_id)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BulkError>;
