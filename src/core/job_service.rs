use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::model::{BatchErrors, BatchInfo, BatchState, CreateJobDto, JobInfo, SfJob};
use crate::domain::ports::BulkApi;
use crate::utils::error::{BulkError, Result};
use crate::utils::logger::redact_id;

/// How `waiting_for_complete` spaces its polls.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Give up after this long. `None` polls until Salesforce is done.
    pub max_wait: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(3),
            max_wait: None,
        }
    }
}

impl PollSettings {
    fn next_delay(&self) -> Duration {
        let min = self.min_interval.as_millis() as u64;
        let max = (self.max_interval.as_millis() as u64).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Drives one Bulk API job: create, add batches, close, wait, collect errors.
pub struct JobService<A: BulkApi> {
    api: A,
    job: Option<SfJob>,
    poll: PollSettings,
}

impl<A: BulkApi> JobService<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            job: None,
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn init_job(&mut self, dto: &CreateJobDto) -> Result<&mut Self> {
        let job_info = self.api.create_job(dto).await?;
        info!(
            "Created {:?} job {} for {}",
            job_info.operation,
            redact_id(&job_info.id),
            job_info.object
        );
        self.job = Some(SfJob::new(job_info));
        Ok(self)
    }

    pub async fn add_batch_to_job<T: Serialize>(&mut self, records: &[T]) -> Result<&mut Self> {
        let payload = serde_json::to_string(records)?;
        let job_info = self.job_info()?.clone();

        let batch = self.api.add_batch(&job_info, payload).await?;
        debug!(
            "Added batch {} with {} records",
            redact_id(&batch.id),
            records.len()
        );
        self.job_mut()?.batches_info.push(batch);
        Ok(self)
    }

    pub async fn close_job(&mut self) -> Result<&mut Self> {
        let job_info = self.job_info()?.clone();
        let closed = self.api.close_job(&job_info).await?;
        info!("Job {} is {:?}", redact_id(&closed.id), closed.state);
        self.job_mut()?.job_info = Some(closed);
        Ok(self)
    }

    /// Polls until no batch is queued or in progress, then keeps the final
    /// batch states.
    pub async fn waiting_for_complete(&mut self) -> Result<&mut Self> {
        let job_info = self.job_info()?.clone();
        let started = Instant::now();

        loop {
            let batches = self.api.batches_info(&job_info).await?;
            let pending = batches.iter().filter(|b| b.state.is_pending()).count();

            if pending == 0 {
                info!(
                    "All {} batches of job {} finished",
                    batches.len(),
                    redact_id(&job_info.id)
                );
                self.job_mut()?.batches_info = batches;
                return Ok(self);
            }

            if let Some(max_wait) = self.poll.max_wait {
                if started.elapsed() >= max_wait {
                    warn!(
                        "Giving up on job {} with {} batches pending",
                        redact_id(&job_info.id),
                        pending
                    );
                    self.job_mut()?.batches_info = batches;
                    return Err(BulkError::PollTimeout {
                        job_id: job_info.id.clone(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            let delay = self.poll.next_delay();
            debug!("{} batches pending, polling again in {:?}", pending, delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Failed batches are reported whole; for the rest, every unsuccessful
    /// record is reported by its position in the batch.
    pub async fn get_errors(&self) -> Result<Vec<BatchErrors>> {
        let mut errors = Vec::new();

        for batch_info in self.batches_info()? {
            let mut batch_errors = BatchErrors::new(batch_info.clone());

            if matches!(batch_info.state, BatchState::Failed | BatchState::NotProcessed) {
                warn!(
                    "Batch {} is {:?}: {}",
                    redact_id(&batch_info.id),
                    batch_info.state,
                    batch_info.state_message.as_deref().unwrap_or("no message")
                );
                errors.push(batch_errors);
                continue;
            }

            let results = self.api.batch_results(batch_info).await?;
            for (index, result) in results.iter().enumerate() {
                if !result.success {
                    batch_errors.add_error(index, serde_json::to_string(&result.errors)?);
                }
            }

            if !batch_errors.error_numbers.is_empty() {
                errors.push(batch_errors);
            }
        }

        Ok(errors)
    }

    pub async fn abort_job(&mut self) -> Result<&mut Self> {
        let job_info = self.job_info()?.clone();
        let aborted = self.api.abort_job(&job_info).await?;
        info!("Job {} is {:?}", redact_id(&aborted.id), aborted.state);
        self.job_mut()?.job_info = Some(aborted);
        Ok(self)
    }

    pub async fn refresh_job_info(&mut self) -> Result<&JobInfo> {
        let job_id = self.job_id()?.to_string();
        let fresh = self.api.job_info(&job_id).await?;
        let job = self.job_mut()?;
        job.job_info = Some(fresh);
        job.job_info.as_ref().ok_or(BulkError::NoActiveJob)
    }

    pub fn job_id(&self) -> Result<&str> {
        Ok(&self.job_info()?.id)
    }

    pub fn job_object(&self) -> Result<&str> {
        Ok(&self.job_info()?.object)
    }

    pub fn job_info(&self) -> Result<&JobInfo> {
        self.job
            .as_ref()
            .and_then(|job| job.job_info.as_ref())
            .ok_or(BulkError::NoActiveJob)
    }

    pub fn batches_info(&self) -> Result<&[BatchInfo]> {
        self.job
            .as_ref()
            .map(|job| job.batches_info.as_slice())
            .ok_or(BulkError::NoActiveJob)
    }

    fn job_mut(&mut self) -> Result<&mut SfJob> {
        self.job.as_mut().ok_or(BulkError::NoActiveJob)
    }
}
