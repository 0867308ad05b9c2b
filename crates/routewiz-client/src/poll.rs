//! Fixed-cadence polling for asynchronous backend jobs.
//!
//! Validation, retry-geocoding and route-creation jobs all report through the
//! same status envelope, so one loop serves all three; only the endpoint and
//! the [`PollSettings`] differ.
//!
//! The loop never retries a failed status request. A 404 means the job id is
//! gone for good and ends the loop as [`EngineError::JobExpired`]; any other
//! failure ends it as [`EngineError::JobPoll`]. Timing uses the tokio clock.

use routewiz_core::PollSettings;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::error::{ClientError, EngineError};
use crate::types::{JobState, JobStatusBody};

/// Which backend queue a job lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Validation,
    RetryGeocoding,
    RouteCreation,
}

impl JobKind {
    /// Path segment of the status endpoint for this kind of job.
    #[must_use]
    pub fn status_endpoint(self) -> &'static str {
        match self {
            JobKind::Validation | JobKind::RetryGeocoding => "validation-status",
            JobKind::RouteCreation => "route-status",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Validation => write!(f, "address validation"),
            JobKind::RetryGeocoding => write!(f, "retry geocoding"),
            JobKind::RouteCreation => write!(f, "route creation"),
        }
    }
}

/// An enqueued backend job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
    pub kind: JobKind,
}

impl JobHandle {
    #[must_use]
    pub fn new(job_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
        }
    }
}

/// Anything that can report a job's current status.
#[allow(async_fn_in_trait)]
pub trait JobStatusSource {
    /// Fetches the job's status once.
    ///
    /// # Errors
    ///
    /// Implementations return [`ClientError::NotFound`] when the job id is
    /// unknown to the backend, and any other [`ClientError`] for transport or
    /// HTTP failures.
    async fn job_status(&self, job: &JobHandle) -> Result<JobStatusBody, ClientError>;
}

/// Polls `job` until it completes, fails, or `settings.max_wait` elapses.
///
/// Each round checks the deadline, fetches the status once, reports progress,
/// and then sleeps `settings.interval`. `on_progress(percent, message)` is
/// called exactly once per round whenever the body carries a progress value
/// or a message, even if nothing changed since the last round.
///
/// On `completed`, the `result` object must be present and carry
/// `"success": true`; it is then decoded as `T`.
///
/// # Errors
///
/// - [`EngineError::JobExpired`] on 404, without polling again.
/// - [`EngineError::JobPoll`] on any other status-request failure or an
///   unrecognised status string.
/// - [`EngineError::JobResult`] if the completed result is absent, reports
///   failure, or does not decode.
/// - [`EngineError::JobFailed`] if the job reports `failed`.
/// - [`EngineError::JobTimeout`] once `max_wait` has elapsed. No cancellation
///   is sent; the backend may still be running the job.
pub async fn poll_job<S, T, P>(
    source: &S,
    job: &JobHandle,
    settings: PollSettings,
    mut on_progress: P,
) -> Result<T, EngineError>
where
    S: JobStatusSource + ?Sized,
    T: DeserializeOwned,
    P: FnMut(u8, &str),
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        let elapsed = started.elapsed();
        if elapsed >= settings.max_wait {
            tracing::warn!(
                job_id = %job.job_id,
                kind = %job.kind,
                attempt,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "job polling timed out; abandoning job without cancelling it"
            );
            return Err(EngineError::JobTimeout {
                kind: job.kind,
                job_id: job.job_id.clone(),
                waited: settings.max_wait,
            });
        }

        attempt += 1;
        let body = match source.job_status(job).await {
            Ok(body) => body,
            Err(ClientError::NotFound { .. }) => {
                return Err(EngineError::JobExpired {
                    kind: job.kind,
                    job_id: job.job_id.clone(),
                });
            }
            Err(source) => {
                return Err(EngineError::JobPoll {
                    kind: job.kind,
                    job_id: job.job_id.clone(),
                    source,
                });
            }
        };

        if body.progress.is_some() || body.message.is_some() {
            on_progress(body.progress_percent(), body.message.as_deref().unwrap_or(""));
        }

        let state = body.state().map_err(|source| EngineError::JobPoll {
            kind: job.kind,
            job_id: job.job_id.clone(),
            source,
        })?;
        tracing::debug!(
            job_id = %job.job_id,
            attempt,
            status = %body.status,
            progress = body.progress_percent(),
            "polled job status"
        );

        match state {
            JobState::Completed => return decode_result(job, body.result),
            JobState::Failed => {
                let message = body
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| format!("{} failed", job.kind));
                return Err(EngineError::JobFailed {
                    kind: job.kind,
                    job_id: job.job_id.clone(),
                    message,
                });
            }
            JobState::Processing => {}
        }

        tokio::time::sleep(settings.interval).await;
    }
}

fn decode_result<T: DeserializeOwned>(
    job: &JobHandle,
    result: Option<serde_json::Value>,
) -> Result<T, EngineError> {
    let no_results = || EngineError::JobResult {
        kind: job.kind,
        job_id: job.job_id.clone(),
        message: format!("{} completed but returned no results", job.kind),
    };

    let value = result.ok_or_else(no_results)?;
    let succeeded = value
        .get("success")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !succeeded {
        return Err(match value.get("error").and_then(serde_json::Value::as_str) {
            Some(message) if !message.trim().is_empty() => EngineError::JobResult {
                kind: job.kind,
                job_id: job.job_id.clone(),
                message: message.to_owned(),
            },
            _ => no_results(),
        });
    }

    serde_json::from_value(value).map_err(|e| EngineError::JobResult {
        kind: job.kind,
        job_id: job.job_id.clone(),
        message: format!("{} result could not be decoded: {e}", job.kind),
    })
}

#[cfg(test)]
#[path = "poll_test.rs"]
mod tests;
