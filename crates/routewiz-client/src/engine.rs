//! Orchestrates one address batch from upload through route creation.
//!
//! The engine holds no batch state of its own. Callers own the
//! [`AddressBatchState`] and pass it in; a correction round borrows it
//! exclusively, so only one job per batch can be in flight.

use std::collections::BTreeMap;
use std::path::Path;

use routewiz_core::{
    index_upload, plan_corrections, AddressBatchState, AddressRecord, AppConfig, CoreError,
    DriverAssignmentCoverage, PollSettings, RouteDriver, RouteSchedule,
};
use serde::de::DeserializeOwned;

use crate::client::BackendClient;
use crate::error::{ClientError, EngineError};
use crate::poll::{self, JobHandle, JobKind};
use crate::types::{
    CorrectedAddressPayload, CreateRoutesRequest, JobOutcome, RetryGeocodingResult,
    RouteCreationResult, ValidateUserResponse, ValidationResult,
};

/// Drives validation, correction, coverage and route-creation jobs against
/// one backend.
#[derive(Debug, Clone)]
pub struct AddressReconciliationEngine {
    client: BackendClient,
    validation_poll: PollSettings,
    retry_poll: PollSettings,
    route_poll: PollSettings,
}

impl AddressReconciliationEngine {
    #[must_use]
    pub fn new(
        client: BackendClient,
        validation_poll: PollSettings,
        retry_poll: PollSettings,
        route_poll: PollSettings,
    ) -> Self {
        Self {
            client,
            validation_poll,
            retry_poll,
            route_poll,
        }
    }

    /// Builds the client and poll cadences from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the HTTP client cannot be built or the
    /// backend URL is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        let client = BackendClient::new(
            &config.backend_url,
            config.request_timeout_secs,
            &config.user_agent,
        )?;
        Ok(Self::new(
            client,
            config.validation_poll,
            config.retry_poll,
            config.route_poll,
        ))
    }

    #[must_use]
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Poll cadence used for jobs of `kind`.
    #[must_use]
    pub fn poll_settings(&self, kind: JobKind) -> PollSettings {
        match kind {
            JobKind::Validation => self.validation_poll,
            JobKind::RetryGeocoding => self.retry_poll,
            JobKind::RouteCreation => self.route_poll,
        }
    }

    /// # Errors
    ///
    /// - [`EngineError::Core`] with [`CoreError::MissingIdentity`] for a blank
    ///   identity, before any request is made.
    /// - Otherwise propagates the client failure as [`EngineError::Client`].
    pub async fn validate_user(&self, identity: &str) -> Result<ValidateUserResponse, EngineError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(CoreError::MissingIdentity.into());
        }
        let response = self.client.validate_user(identity).await?;
        tracing::info!(
            drivers = response.sub_drivers.len(),
            "user validated"
        );
        Ok(response)
    }

    /// Uploads a spreadsheet and stamps each parsed row with its position.
    ///
    /// # Errors
    ///
    /// Propagates the client failure as [`EngineError::Client`].
    pub async fn upload(&self, path: &Path) -> Result<Vec<AddressRecord>, EngineError> {
        let response = self.client.upload_addresses(path).await?;
        let records = index_upload(response.addresses);
        tracing::info!(
            file = %path.display(),
            reported = response.count,
            parsed = records.len(),
            "address file uploaded"
        );
        Ok(records)
    }

    /// Enqueues validation for a batch. No local state changes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ValidationStart`] if the batch is empty, the
    /// identity is blank, or the backend refuses or cannot be reached.
    pub async fn start_validation(
        &self,
        addresses: &[AddressRecord],
        identity: &str,
    ) -> Result<JobHandle, EngineError> {
        let identity = require_identity(identity, JobKind::Validation)?;
        if addresses.is_empty() {
            return Err(start_error(JobKind::Validation, "no addresses to validate"));
        }

        self.client
            .validate_addresses(identity, addresses)
            .await
            .map_err(|e| start_error(JobKind::Validation, e))
    }

    /// Polls `job` with the cadence configured for its kind.
    ///
    /// # Errors
    ///
    /// See [`poll::poll_job`].
    pub async fn poll_job<T: DeserializeOwned>(
        &self,
        job: &JobHandle,
        on_progress: impl FnMut(u8, &str),
    ) -> Result<T, EngineError> {
        poll::poll_job(&self.client, job, self.poll_settings(job.kind), on_progress).await
    }

    /// Polls a validation or retry-geocoding job to its decoded result.
    ///
    /// # Errors
    ///
    /// See [`poll::poll_job`]. A route-creation handle is rejected as
    /// [`EngineError::JobResult`] without polling.
    pub async fn wait_for_geocoding(
        &self,
        job: &JobHandle,
        on_progress: impl FnMut(u8, &str),
    ) -> Result<JobOutcome, EngineError> {
        match job.kind {
            JobKind::Validation => {
                let result: ValidationResult = self.poll_job(job, on_progress).await?;
                tracing::info!(
                    job_id = %job.job_id,
                    valid = result.valid_count,
                    invalid = result.invalid_count,
                    "address validation completed"
                );
                Ok(JobOutcome::Validation(result))
            }
            JobKind::RetryGeocoding => {
                let result: RetryGeocodingResult = self.poll_job(job, on_progress).await?;
                tracing::info!(
                    job_id = %job.job_id,
                    results = result.results.len(),
                    "retry geocoding completed"
                );
                Ok(JobOutcome::RetryGeocoding(result))
            }
            JobKind::RouteCreation => Err(EngineError::JobResult {
                kind: job.kind,
                job_id: job.job_id.clone(),
                message: "route creation jobs carry no geocoding result".to_owned(),
            }),
        }
    }

    /// Merges a finished job into `state`. Pure; see
    /// [`AddressBatchState::reconcile`].
    ///
    /// `submitted` is the list of records the job was sent, in request order.
    /// It ties result rows without `originalIndex` back to the batch.
    #[must_use]
    pub fn reconcile(
        state: &AddressBatchState,
        outcome: &JobOutcome,
        submitted: &[AddressRecord],
    ) -> AddressBatchState {
        let next = state.reconcile(&outcome.records(submitted));
        tracing::info!(
            valid = next.valid_addresses().len(),
            invalid = next.invalid_addresses().len(),
            manual = next.manual_coordinates().len(),
            "address batch reconciled"
        );
        next
    }

    /// Upload-to-state in one call: start validation, wait for it, and
    /// reconcile the result into a fresh batch.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ValidationStart`] for an empty batch or a failed start.
    /// - [`EngineError::Core`] if two records share an `original_index`.
    /// - Any polling error from [`poll::poll_job`].
    pub async fn validate_batch(
        &self,
        records: Vec<AddressRecord>,
        identity: &str,
        on_progress: impl FnMut(u8, &str),
    ) -> Result<AddressBatchState, EngineError> {
        let state = match AddressBatchState::from_upload(records.clone()) {
            Ok(state) => state,
            Err(CoreError::EmptyBatch) => {
                return Err(start_error(JobKind::Validation, "no addresses to validate"));
            }
            Err(other) => return Err(other.into()),
        };

        let job = self.start_validation(&records, identity).await?;
        let outcome = self.wait_for_geocoding(&job, on_progress).await?;
        Ok(Self::reconcile(&state, &outcome, &records))
    }

    /// Sends the changed invalid addresses for re-geocoding.
    ///
    /// `corrections` maps `original_index` to the text in that address's
    /// field. Manual pins already recorded in `state` are sent alongside.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoCorrections`] (informational) if nothing changed.
    /// - [`EngineError::ValidationStart`] if the identity is blank or the
    ///   backend refuses the retry.
    pub async fn submit_corrections(
        &self,
        corrections: &BTreeMap<usize, String>,
        state: &AddressBatchState,
        identity: &str,
    ) -> Result<JobHandle, EngineError> {
        let (job, _) = self.send_corrections(corrections, state, identity).await?;
        Ok(job)
    }

    /// Like [`submit_corrections`](Self::submit_corrections), also returning
    /// the original records that were sent, in request order.
    async fn send_corrections(
        &self,
        corrections: &BTreeMap<usize, String>,
        state: &AddressBatchState,
        identity: &str,
    ) -> Result<(JobHandle, Vec<AddressRecord>), EngineError> {
        let identity = require_identity(identity, JobKind::RetryGeocoding)?;
        let plan = plan_corrections(state, corrections)?;
        let unchanged = plan.unchanged.len();
        let sent: Vec<AddressRecord> = plan.entries.iter().map(|e| e.original.clone()).collect();
        let payload: Vec<CorrectedAddressPayload> =
            plan.entries.into_iter().map(Into::into).collect();

        tracing::info!(
            corrected = payload.len(),
            unchanged,
            "submitting address corrections"
        );
        let job = self
            .client
            .retry_geocoding(identity, &payload)
            .await
            .map_err(|e| start_error(JobKind::RetryGeocoding, e))?;
        Ok((job, sent))
    }

    /// Submit, wait, reconcile. `state` is replaced only when the whole
    /// round succeeds; on any error it is left untouched.
    ///
    /// # Errors
    ///
    /// Anything [`submit_corrections`](Self::submit_corrections) or
    /// [`poll::poll_job`] returns.
    pub async fn run_correction_round(
        &self,
        corrections: &BTreeMap<usize, String>,
        state: &mut AddressBatchState,
        identity: &str,
        on_progress: impl FnMut(u8, &str),
    ) -> Result<(), EngineError> {
        let (job, sent) = self.send_corrections(corrections, state, identity).await?;
        let outcome = self.wait_for_geocoding(&job, on_progress).await?;
        *state = Self::reconcile(state, &outcome, &sent);
        Ok(())
    }

    /// Asks the backend whether the selected drivers cover every problem type
    /// in `addresses`.
    ///
    /// Advisory only: failures are logged and turn into `None`.
    pub async fn check_coverage(
        &self,
        selected_drivers: &[String],
        addresses: &[AddressRecord],
    ) -> Option<DriverAssignmentCoverage> {
        match self
            .client
            .validate_driver_assignments(selected_drivers, addresses)
            .await
        {
            Ok(report) => {
                if !report.fully_covered {
                    tracing::info!(
                        uncovered = ?report.uncovered(),
                        "selected drivers do not cover every problem type"
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "driver coverage check failed; continuing without it");
                None
            }
        }
    }

    /// Enqueues route creation for the finalized addresses.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Core`] with [`CoreError::NoDrivers`] or
    ///   [`CoreError::EmptyBatch`] before any request is made.
    /// - [`EngineError::RouteCreationStart`] if the identity is blank or the
    ///   backend refuses the request.
    pub async fn create_routes(
        &self,
        identity: &str,
        drivers: &[RouteDriver],
        addresses: &[AddressRecord],
        schedule: RouteSchedule,
    ) -> Result<JobHandle, EngineError> {
        if drivers.is_empty() {
            return Err(CoreError::NoDrivers.into());
        }
        if addresses.is_empty() {
            return Err(CoreError::EmptyBatch.into());
        }
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(EngineError::RouteCreationStart(
                "an email or username is required".to_owned(),
            ));
        }

        let request = CreateRoutesRequest {
            username: identity,
            selected_drivers: drivers,
            addresses,
            route_date: schedule.date_string(),
            route_time: schedule.time_string(),
        };
        self.client
            .create_routes(&request)
            .await
            .map_err(|e| EngineError::RouteCreationStart(e.to_string()))
    }

    /// Polls a route-creation job with the route cadence.
    ///
    /// # Errors
    ///
    /// See [`poll::poll_job`].
    pub async fn wait_for_routes(
        &self,
        job: &JobHandle,
        on_progress: impl FnMut(u8, &str),
    ) -> Result<RouteCreationResult, EngineError> {
        let result: RouteCreationResult = self.poll_job(job, on_progress).await?;
        let failed = result.created_routes.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            job_id = %job.job_id,
            total = result.total_routes,
            failed,
            "route creation completed"
        );
        Ok(result)
    }
}

fn require_identity(identity: &str, kind: JobKind) -> Result<&str, EngineError> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(start_error(kind, "an email or username is required"));
    }
    Ok(identity)
}

fn start_error(kind: JobKind, message: impl ToString) -> EngineError {
    EngineError::ValidationStart {
        kind,
        message: message.to_string(),
    }
}
