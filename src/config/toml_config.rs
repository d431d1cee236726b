use crate::domain::model::{ConcurrencyMode, Operation};
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::{
    validate_api_version, validate_path, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LoginConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub security_token: Option<String>,
    pub instance_url: Option<String>,
    pub session_id: Option<String>,
    pub login_url: Option<String>,
    pub api_version: Option<String>,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("LoginConfig")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("security_token", &redact(&self.security_token))
            .field("instance_url", &self.instance_url)
            .field("session_id", &redact(&self.session_id))
            .field("login_url", &self.login_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    pub object: Option<String>,
    pub operation: Option<Operation>,
    pub external_id_field: Option<String>,
    pub concurrency_mode: Option<ConcurrencyMode>,
    pub assignment_rule_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingConfig {
    pub min_interval_seconds: Option<u64>,
    pub max_interval_seconds: Option<u64>,
    pub max_wait_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSection {
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BulkError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BulkError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| BulkError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.login.login_url {
            validate_url("login.login_url", url)?;
        }
        if let Some(url) = &self.login.instance_url {
            validate_url("login.instance_url", url)?;
        }
        if let Some(version) = &self.login.api_version {
            validate_api_version("login.api_version", version)?;
        }
        if let Some(size) = self.batch.size {
            validate_range("batch.size", size, 1, crate::core::runner::MAX_BATCH_SIZE)?;
        }
        if let (Some(min), Some(max)) = (
            self.polling.min_interval_seconds,
            self.polling.max_interval_seconds,
        ) {
            if min > max {
                return Err(BulkError::InvalidConfigValueError {
                    field: "polling.min_interval_seconds".to_string(),
                    value: min.to_string(),
                    reason: format!("Must not exceed polling.max_interval_seconds ({})", max),
                });
            }
        }
        if let Some(path) = &self.output.path {
            validate_path("output.path", path)?;
        }
        Ok(())
    }
}
