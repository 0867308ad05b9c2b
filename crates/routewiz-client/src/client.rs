//! HTTP client for the route-planning backend.
//!
//! Wraps `reqwest` with the backend's error conventions: non-2xx responses
//! carry a JSON body whose `error` string becomes [`ClientError::Api`], and a
//! 404 from a job-status endpoint becomes [`ClientError::NotFound`]. Nothing
//! here retries; callers decide what a failure means.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use routewiz_core::{AddressRecord, DriverAssignmentCoverage};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;
use crate::poll::{JobHandle, JobKind, JobStatusSource};
use crate::types::{
    CorrectedAddressPayload, CreateRoutesRequest, DriverAssignmentRequest,
    DriverAssignmentResponse, JobStartResponse, JobStatusBody, RetryGeocodingRequest,
    UploadResponse, ValidateAddressesRequest, ValidateUserRequest, ValidateUserResponse,
};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

/// Client for the route-planning backend.
///
/// Use [`BackendClient::new`] with the backend's base URL (for example
/// `https://host/api`); endpoint paths are appended to it.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "expected an http(s) URL".to_owned(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    /// Resolves the caller's account and the drivers they dispatch for.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] on a non-2xx response.
    /// - [`ClientError::Rejected`] if the body reports `success: false`.
    /// - [`ClientError::Http`] / [`ClientError::Deserialize`] on transport or
    ///   decoding failure.
    pub async fn validate_user(&self, username: &str) -> Result<ValidateUserResponse, ClientError> {
        let response: ValidateUserResponse = self
            .post_json("validate-user", &ValidateUserRequest { username })
            .await?;
        if !response.success {
            return Err(ClientError::Rejected("user validation failed".to_owned()));
        }
        Ok(response)
    }

    /// Uploads a spreadsheet and returns the rows the backend parsed out of it.
    ///
    /// Only `.xlsx` and `.xls` files are accepted; anything else is rejected
    /// before any request is made.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnsupportedFile`] for other extensions.
    /// - [`ClientError::Io`] if the file cannot be read.
    /// - [`ClientError::Api`] / [`ClientError::Rejected`] if the backend
    ///   refuses the file.
    pub async fn upload_addresses(&self, path: &Path) -> Result<UploadResponse, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        let mime = spreadsheet_mime(&file_name)
            .ok_or_else(|| ClientError::UnsupportedFile(path.display().to_string()))?;

        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::debug!(file = %file_name, bytes = bytes.len(), "uploading address file");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
        let form = Form::new().part("file", part);
        let url = self.endpoint(&["upload-addresses"]);
        let response = self.client.post(url.clone()).multipart(form).send().await?;
        let parsed: UploadResponse = Self::read_json(response, &url).await?;

        if !parsed.success {
            return Err(ClientError::Rejected("file processing failed".to_owned()));
        }
        Ok(parsed)
    }

    /// Enqueues geocoding validation for a batch and returns the job handle.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the batch.
    /// - [`ClientError::Rejected`] if the body reports `success: false` or
    ///   carries no `job_id`.
    pub async fn validate_addresses(
        &self,
        username: &str,
        addresses: &[AddressRecord],
    ) -> Result<JobHandle, ClientError> {
        self.start_job(
            "validate-addresses",
            &ValidateAddressesRequest {
                username,
                addresses,
            },
            JobKind::Validation,
        )
        .await
    }

    /// Enqueues re-geocoding for corrected addresses.
    ///
    /// # Errors
    ///
    /// Same as [`validate_addresses`](Self::validate_addresses).
    pub async fn retry_geocoding(
        &self,
        username: &str,
        corrected_addresses: &[CorrectedAddressPayload],
    ) -> Result<JobHandle, ClientError> {
        self.start_job(
            "retry-geocoding",
            &RetryGeocodingRequest {
                username,
                corrected_addresses,
            },
            JobKind::RetryGeocoding,
        )
        .await
    }

    /// Enqueues route creation.
    ///
    /// # Errors
    ///
    /// Same as [`validate_addresses`](Self::validate_addresses).
    pub async fn create_routes(
        &self,
        request: &CreateRoutesRequest<'_>,
    ) -> Result<JobHandle, ClientError> {
        self.start_job("create-routes", request, JobKind::RouteCreation)
            .await
    }

    /// Asks which selected drivers can serve which problem types.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] on a non-2xx response.
    /// - [`ClientError::Rejected`] if the body reports `success: false`.
    pub async fn validate_driver_assignments(
        &self,
        selected_drivers: &[String],
        addresses: &[AddressRecord],
    ) -> Result<DriverAssignmentCoverage, ClientError> {
        let response: DriverAssignmentResponse = self
            .post_json(
                "validate-driver-assignments",
                &DriverAssignmentRequest {
                    selected_drivers,
                    addresses,
                },
            )
            .await?;
        if !response.success {
            return Err(ClientError::Rejected(
                "driver assignment validation failed".to_owned(),
            ));
        }
        Ok(response.report)
    }

    /// Fetches one job's status from the endpoint for its kind.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] on HTTP 404.
    /// - [`ClientError::Api`] on any other non-2xx status.
    /// - [`ClientError::Http`] / [`ClientError::Deserialize`] on transport or
    ///   decoding failure.
    pub async fn job_status(&self, job: &JobHandle) -> Result<JobStatusBody, ClientError> {
        let url = self.endpoint(&[job.kind.status_endpoint(), job.job_id.as_str()]);
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }
        Self::read_json(response, &url).await
    }

    async fn start_job<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        kind: JobKind,
    ) -> Result<JobHandle, ClientError> {
        let response: JobStartResponse = self.post_json(path, body).await?;
        match response.job_id {
            Some(job_id) if response.success && !job_id.is_empty() => {
                tracing::info!(%job_id, %kind, "backend job enqueued");
                Ok(JobHandle::new(job_id, kind))
            }
            _ => Err(ClientError::Rejected(format!("{kind} failed to start"))),
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&[path]);
        let response = self.client.post(url.clone()).json(body).send().await?;
        Self::read_json(response, &url).await
    }

    /// Reads the body, maps non-2xx statuses to [`ClientError::Api`] using
    /// the body's `error` field, and decodes 2xx bodies as `T`.
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &Url,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_owned()
                });
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // new() rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl JobStatusSource for BackendClient {
    async fn job_status(&self, job: &JobHandle) -> Result<JobStatusBody, ClientError> {
        BackendClient::job_status(self, job).await
    }
}

/// MIME type for an accepted spreadsheet name, matched case-insensitively.
pub(crate) fn spreadsheet_mime(file_name: &str) -> Option<&'static str> {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        Some(XLSX_MIME)
    } else if lower.ends_with(".xls") {
        Some(XLS_MIME)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
