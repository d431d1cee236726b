//! Authenticated HTTP access to the Bulk API with retry and re-login.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::adapters::salesforce::login::{self, LoginParams, Session};
use crate::adapters::salesforce::{batch_api, job_api};
use crate::domain::model::{BatchInfo, BatchResult, CreateJobDto, JobInfo};
use crate::domain::ports::BulkApi;
use crate::utils::error::{BulkError, Result};

const CLIENT_USER_AGENT: &str = concat!("sf-bulk/", env!("CARGO_PKG_VERSION"));
const SESSION_HEADER: &str = "X-SFDC-Session";
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Extra attempts after a transient failure. Only GETs are repeated;
    /// a POST may have reached Salesforce before it failed.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_attempts: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Error body returned by the Bulk API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsyncApiError {
    exception_code: String,
    exception_message: String,
}

#[derive(Clone)]
pub struct SalesforceClient {
    http: reqwest::Client,
    params: LoginParams,
    session: Arc<RwLock<Session>>,
    config: HttpConfig,
}

impl SalesforceClient {
    /// Logs in and returns a ready client.
    pub async fn connect(params: LoginParams, config: HttpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()?;
        let session = login::login(&http, &params).await?;

        Ok(Self {
            http,
            params,
            session: Arc::new(RwLock::new(session)),
            config,
        })
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(Method::GET, path, None).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(&self, path: &str, body: String) -> Result<T> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T> {
        let mut attempt = 0;
        let mut relogged = false;

        loop {
            match self.execute_once(&method, path, body.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(BulkError::SessionExpired) if !relogged && self.params.can_relogin() => {
                    relogged = true;
                    warn!("[BULK] session rejected, logging in again");
                    self.relogin().await?;
                }
                Err(e)
                    if method == Method::GET
                        && e.is_retryable()
                        && attempt < self.config.retry_attempts =>
                {
                    attempt += 1;
                    warn!(
                        "[BULK] {} {} failed ({}), retry {}/{}",
                        method, path, e, attempt, self.config.retry_attempts
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<T> {
        let (url, session_id) = {
            let session = self.session.read().await;
            (
                session.async_url(path)?,
                session.session_id.expose_secret().to_string(),
            )
        };

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(SESSION_HEADER, session_id);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("[BULK] {} {} -> {}", method, path, status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn relogin(&self) -> Result<()> {
        let fresh = login::login(&self.http, &self.params).await?;
        *self.session.write().await = fresh;
        Ok(())
    }
}

async fn parse_error_response(response: reqwest::Response, status: StatusCode) -> BulkError {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));

    if let Ok(err) = serde_json::from_str::<AsyncApiError>(&body) {
        if err.exception_code == "InvalidSessionId" {
            return BulkError::SessionExpired;
        }
        return BulkError::SalesforceError {
            code: err.exception_code,
            message: err.exception_message,
            status: status.as_u16(),
        };
    }

    BulkError::SalesforceError {
        code: "HTTP_ERROR".to_string(),
        message: status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        status: status.as_u16(),
    }
}

#[async_trait]
impl BulkApi for SalesforceClient {
    async fn create_job(&self, dto: &CreateJobDto) -> Result<JobInfo> {
        job_api::create(self, dto).await
    }

    async fn close_job(&self, job: &JobInfo) -> Result<JobInfo> {
        job_api::close(self, job).await
    }

    async fn abort_job(&self, job: &JobInfo) -> Result<JobInfo> {
        job_api::abort(self, job).await
    }

    async fn job_info(&self, job_id: &str) -> Result<JobInfo> {
        job_api::info(self, job_id).await
    }

    async fn add_batch(&self, job: &JobInfo, payload: String) -> Result<BatchInfo> {
        batch_api::add_to_job(self, job, payload).await
    }

    async fn batches_info(&self, job: &JobInfo) -> Result<Vec<BatchInfo>> {
        batch_api::info_for_all_in_job(self, job).await
    }

    async fn batch_results(&self, batch: &BatchInfo) -> Result<Vec<BatchResult>> {
        batch_api::results(self, batch).await
    }
}
