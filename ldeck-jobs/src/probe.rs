/// Outbound link probing and health classification.
///
/// Probes reach arbitrary third-party hosts, so every request carries a hard
/// deadline and an identifying client header, and is abandoned (never
/// retried) on expiry.

use async_trait::async_trait;
use ldeck_core::config::SweepConfig;
use ldeck_core::{Error, HealthState, Result};
use std::time::{Duration, Instant};
use tracing::debug;

const USER_AGENT: &str = concat!("linkdeck-bot/", env!("CARGO_PKG_VERSION"));

/// Observed result of a single outbound request.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    /// HTTP status, if a response arrived
    pub status: Option<u16>,
    /// Time to response (or to failure)
    pub elapsed: Duration,
    /// Transport-level error detail, if any
    pub error: Option<String>,
    /// Response body, only populated by `fetch_page`
    pub body: Option<String>,
}

impl ProbeOutcome {
    pub fn failed(elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            status: None,
            elapsed,
            error: Some(error.into()),
            body: None,
        }
    }

    /// Error view of a transport-level failure, for logs and summaries.
    /// `None` when a response arrived, whatever its status.
    pub fn probe_error(&self) -> Option<Error> {
        self.error
            .as_ref()
            .map(|detail| Error::ProbeFailure(detail.clone()))
    }
}

#[async_trait]
pub trait Prober: Send + Sync {
    /// Lightweight reachability check; no body.
    async fn probe(&self, url: &str) -> ProbeOutcome;

    /// Full GET for metadata extraction; body populated on success.
    async fn fetch_page(&self, url: &str) -> ProbeOutcome;
}

/// Classify a probe outcome into a health state.
///
/// Policy: 2xx within the slow threshold is healthy, slow 2xx and all 3xx
/// are warnings (possible broken redirect chain), 401/403 are warnings (may
/// be intentionally gated), 404 and 5xx are broken, any other 4xx is a
/// warning, and a transport failure or timeout is broken with the error
/// detail retained.
pub fn classify(outcome: &ProbeOutcome, config: &SweepConfig) -> (HealthState, Option<String>) {
    let Some(status) = outcome.status else {
        let detail = outcome
            .error
            .clone()
            .unwrap_or_else(|| "request failed".to_string());
        return (HealthState::Broken, Some(detail));
    };

    match status {
        200..=299 => {
            if outcome.elapsed <= config.slow_threshold {
                (HealthState::Healthy, None)
            } else {
                (
                    HealthState::Warning,
                    Some(format!("slow response: {}ms", outcome.elapsed.as_millis())),
                )
            }
        }
        300..=399 => (HealthState::Warning, Some(format!("redirect: HTTP {}", status))),
        401 | 403 => (HealthState::Warning, Some(format!("access gated: HTTP {}", status))),
        404 => (HealthState::Broken, Some("HTTP 404".to_string())),
        500..=599 => (HealthState::Broken, Some(format!("HTTP {}", status))),
        _ => (HealthState::Warning, Some(format!("HTTP {}", status))),
    }
}

/// Prober backed by a shared reqwest client.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(config: &SweepConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("probe client: {}", e)))?;
        Ok(Self { client })
    }

    async fn head_then_get(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                // Some hosts reject HEAD outright; retry those with GET
                if status == 405 {
                    return self.get_status_only(url, start).await;
                }
                ProbeOutcome {
                    status: Some(status),
                    elapsed: start.elapsed(),
                    error: None,
                    body: None,
                }
            }
            Err(e) => ProbeOutcome::failed(start.elapsed(), describe(&e)),
        }
    }

    async fn get_status_only(&self, url: &str, start: Instant) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(response) => ProbeOutcome {
                status: Some(response.status().as_u16()),
                elapsed: start.elapsed(),
                error: None,
                body: None,
            },
            Err(e) => ProbeOutcome::failed(start.elapsed(), describe(&e)),
        }
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let outcome = self.head_then_get(url).await;
        debug!(url, status = ?outcome.status, elapsed_ms = outcome.elapsed.as_millis() as u64, "probed");
        outcome
    }

    async fn fetch_page(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let elapsed = start.elapsed();
                let body = if (200..300).contains(&status) {
                    response.text().await.ok()
                } else {
                    None
                };
                ProbeOutcome {
                    status: Some(status),
                    elapsed,
                    error: None,
                    body,
                }
            }
            Err(e) => ProbeOutcome::failed(start.elapsed(), describe(&e)),
        }
    }
}
