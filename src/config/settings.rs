use std::time::Duration;

use crate::adapters::salesforce::{HttpConfig, LoginParams};
use crate::config::toml_config::{LoginConfig, TomlConfig};
use crate::core::job_service::PollSettings;
use crate::domain::model::{CreateJobDto, Operation};
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::{validate_required_field, Validate};

pub const DEFAULT_BATCH_SIZE: usize = crate::core::runner::MAX_BATCH_SIZE;
pub const DEFAULT_OUTPUT_PATH: &str = "./output";

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub object: Option<String>,
    pub operation: Option<Operation>,
    pub external_id_field: Option<String>,
    pub batch_size: Option<usize>,
    pub output_path: Option<String>,
    pub max_wait_seconds: Option<u64>,
}

/// Everything a run needs, after merging file, flags and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub login: LoginParams,
    pub http: HttpConfig,
    pub poll: PollSettings,
    pub job: CreateJobDto,
    pub batch_size: usize,
    pub output_path: String,
}

impl Settings {
    pub fn resolve(file: TomlConfig, overrides: Overrides) -> Result<Self> {
        file.validate()?;

        let object = overrides.object.or(file.job.object);
        let object = validate_required_field("job.object", &object)?.clone();
        let operation = overrides
            .operation
            .or(file.job.operation)
            .unwrap_or(Operation::Insert);

        let mut job = CreateJobDto::new(object, operation);
        job.external_id_field_name = overrides.external_id_field.or(file.job.external_id_field);
        job.concurrency_mode = file.job.concurrency_mode;
        job.assignment_rule_id = file.job.assignment_rule_id;
        job.validate()?;

        let defaults = HttpConfig::default();
        let http = HttpConfig {
            timeout: file
                .http
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retry_attempts: file.http.retry_attempts.unwrap_or(defaults.retry_attempts),
            retry_delay: file
                .http
                .retry_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
        };

        let poll_defaults = PollSettings::default();
        let poll = PollSettings {
            min_interval: file
                .polling
                .min_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(poll_defaults.min_interval),
            max_interval: file
                .polling
                .max_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(poll_defaults.max_interval),
            max_wait: overrides
                .max_wait_seconds
                .or(file.polling.max_wait_seconds)
                .map(Duration::from_secs),
        };

        let batch_size = overrides
            .batch_size
            .or(file.batch.size)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let output_path = overrides
            .output_path
            .or(file.output.path)
            .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string());

        Ok(Self {
            login: login_params(&file.login)?,
            http,
            poll,
            job,
            batch_size,
            output_path,
        })
    }
}

fn env_or(value: &Option<String>, var: &str) -> Option<String> {
    let usable = |v: &String| !v.trim().is_empty() && !is_unresolved_placeholder(v);
    value
        .clone()
        .filter(usable)
        .or_else(|| std::env::var(var).ok().filter(usable))
}

/// `${VAR}` left behind by substitution because `VAR` was not set.
fn is_unresolved_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("${") && value.ends_with('}')
}

fn login_params(login: &LoginConfig) -> Result<LoginParams> {
    let session_id = env_or(&login.session_id, "SF_SESSION_ID");
    let instance_url = env_or(&login.instance_url, "SF_INSTANCE_URL");
    let username = env_or(&login.username, "SF_USERNAME");
    let password = env_or(&login.password, "SF_PASSWORD");
    let security_token = env_or(&login.security_token, "SF_SECURITY_TOKEN").unwrap_or_default();

    let mut params = match (session_id, instance_url, username, password) {
        (Some(session_id), Some(instance_url), _, _) => {
            LoginParams::with_session(instance_url, session_id)
        }
        (_, _, Some(username), Some(password)) => {
            LoginParams::with_password(username, password, security_token)
        }
        (_, _, Some(_), None) => {
            return Err(BulkError::MissingConfigError {
                field: "login.password".to_string(),
            })
        }
        _ => {
            return Err(BulkError::MissingConfigError {
                field: "login.username".to_string(),
            })
        }
    };

    if let Some(version) = &login.api_version {
        params = params.api_version(version.clone());
    }
    if let Some(url) = &login.login_url {
        params = params.login_url(url.clone());
    }
    Ok(params)
}
