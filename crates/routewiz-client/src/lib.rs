//! HTTP side of the route-planning wizard: the backend client, the generic
//! job poller, and the engine that runs an address batch through validation,
//! correction and route creation.

pub mod client;
pub mod engine;
pub mod error;
pub mod poll;
pub mod types;

pub use client::BackendClient;
pub use engine::AddressReconciliationEngine;
pub use error::{ClientError, EngineError};
pub use poll::{poll_job, JobHandle, JobKind, JobStatusSource};
pub use types::{
    CorrectedAddressPayload, CreateRoutesRequest, CreatedRoute, JobOutcome, JobState,
    JobStatusBody, ManualCoordinatesPayload, Member, RetryGeocodingResult, RetryRecord,
    RouteCreationResult, UploadResponse, ValidateUserResponse, ValidationResult,
};
