/// Thin forwarding layer to an external scheduling service.
///
/// The scheduler accepts a callback URL, a JSON body, and either immediate
/// dispatch or a cron expression; its callbacks land on this subsystem's
/// job-handler endpoints. When no scheduler is configured every submission
/// degrades to a warning no-op: maintenance simply does not run, the caller
/// is never blocked.

use async_trait::async_trait;
use ldeck_core::{Error, JobKind, JobRequest, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Submit a job for immediate or cron-scheduled execution.
    async fn dispatch(&self, job: &JobRequest) -> Result<()>;
}

/// Scheduler backed by an HTTP scheduling service.
pub struct HttpScheduler {
    client: reqwest::Client,
    endpoint: String,
    callback_base: String,
}

impl HttpScheduler {
    pub fn new(endpoint: impl Into<String>, callback_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("scheduler client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            callback_base: callback_base.into(),
        })
    }

    fn callback_url(&self, kind: JobKind) -> String {
        let path = match kind {
            JobKind::HealthSweep => "/jobs/health-sweep",
            JobKind::MetadataRefresh => "/jobs/metadata-refresh",
        };
        format!("{}{}", self.callback_base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Scheduler for HttpScheduler {
    async fn dispatch(&self, job: &JobRequest) -> Result<()> {
        let mut body = json!({
            "url": self.callback_url(job.kind),
            "body": { "list_id": job.list_id },
        });
        if let Some(cron) = &job.cron {
            body["cron"] = json!(cron);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::DispatchFailure(format!("scheduler unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::DispatchFailure(format!(
                "scheduler rejected job: HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }
}

/// Submits maintenance work, decoupling request latency from sweeps.
///
/// Submission failures surface as retryable `DispatchFailure`; callers on an
/// interactive path treat them as best-effort and must not fail the
/// user-facing operation because scheduling failed.
pub struct JobDispatcher {
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl JobDispatcher {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler: Some(scheduler),
        }
    }

    /// A dispatcher with no scheduler configured; every call is a no-op.
    pub fn disabled() -> Self {
        Self { scheduler: None }
    }

    /// Submit one-shot maintenance work for a list.
    pub async fn submit(&self, kind: JobKind, list_id: &str) -> Result<()> {
        let Some(scheduler) = &self.scheduler else {
            warn!(?kind, list_id, "no scheduler configured, skipping job submission");
            return Ok(());
        };
        let job = JobRequest::once(kind, list_id);
        scheduler.dispatch(&job).await?;
        info!(?kind, list_id, "submitted job");
        Ok(())
    }

    /// Submit a recurring sweep on a cron schedule.
    pub async fn submit_recurring(&self, kind: JobKind, list_id: &str, cron: &str) -> Result<()> {
        validate_cron(cron)?;
        let Some(scheduler) = &self.scheduler else {
            warn!(?kind, list_id, cron, "no scheduler configured, skipping recurring job");
            return Ok(());
        };
        let job = JobRequest::recurring(kind, list_id, cron);
        scheduler.dispatch(&job).await?;
        info!(?kind, list_id, cron, "submitted recurring job");
        Ok(())
    }
}

/// Shallow shape check; full parsing is the scheduling service's job.
fn validate_cron(cron: &str) -> Result<()> {
    let fields = cron.split_whitespace().count();
    if !(5..=6).contains(&fields) {
        return Err(Error::InvalidArgument(format!(
            "cron expression needs 5 or 6 fields, got {}",
            fields
        )));
    }
    Ok(())
}
