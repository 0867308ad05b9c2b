use std::time::Duration;

use routewiz_core::CoreError;
use thiserror::Error;

use crate::poll::JobKind;

/// Errors returned by [`BackendClient`](crate::BackendClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the body's `error` field when present.
    #[error("backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP 404 from a job-status endpoint: the job id is unknown or expired.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// 2xx response whose body reported `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// The job-status body carried a status other than
    /// `processing`, `completed` or `failed`.
    #[error("unknown job status '{0}'")]
    UnknownJobStatus(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid backend URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("unsupported file '{0}': upload an Excel file (.xlsx or .xls)")]
    UnsupportedFile(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures surfaced to the wizard by
/// [`AddressReconciliationEngine`](crate::AddressReconciliationEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The backend refused to enqueue a validation or retry job.
    #[error("{kind} failed to start: {message}")]
    ValidationStart { kind: JobKind, message: String },

    #[error("route creation failed to start: {0}")]
    RouteCreationStart(String),

    /// The status endpoint returned 404. Never retried.
    #[error("{kind} job {job_id} not found or expired")]
    JobExpired { kind: JobKind, job_id: String },

    /// A status request failed for any reason other than 404.
    #[error("failed to check {kind} status for job {job_id}: {source}")]
    JobPoll {
        kind: JobKind,
        job_id: String,
        #[source]
        source: ClientError,
    },

    /// The job completed but its result is missing, reports failure, or
    /// cannot be decoded.
    #[error("{message}")]
    JobResult {
        kind: JobKind,
        job_id: String,
        message: String,
    },

    /// The job reached the `failed` state.
    #[error("{message}")]
    JobFailed {
        kind: JobKind,
        job_id: String,
        message: String,
    },

    /// No terminal state within the configured wait. The backend job is
    /// abandoned, not cancelled.
    #[error("{kind} timed out after {}s", .waited.as_secs())]
    JobTimeout {
        kind: JobKind,
        job_id: String,
        waited: Duration,
    },

    #[error("invalid coordinate ({lat}, {lng}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Informational: nothing to re-send.
    #[error("no corrections were made; proceed with the current addresses to continue as-is")]
    NoCorrections,

    #[error(transparent)]
    Core(CoreError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl EngineError {
    /// `true` when the UI should show a notice rather than an error.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, EngineError::NoCorrections)
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCoordinate { lat, lng } => EngineError::InvalidCoordinate { lat, lng },
            CoreError::NoCorrections => EngineError::NoCorrections,
            other => EngineError::Core(other),
        }
    }
}
