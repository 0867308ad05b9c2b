//! Domain model and pure reconciliation logic for the route-planning wizard.
//!
//! Nothing in this crate performs I/O beyond reading environment variables in
//! [`load_app_config`]. The HTTP side lives in `routewiz-client`.

pub mod address;
pub mod app_config;
pub mod batch;
pub mod config;
pub mod corrections;
pub mod coverage;
pub mod routes;

use thiserror::Error;

pub use address::{
    index_upload, resolve_result_rows, AddressRecord, Confidence, ManualCoordinate, RawAddress,
    ResultRow,
};
pub use app_config::{AppConfig, PollSettings};
pub use batch::{AddressBatchState, FinalizeSummary};
pub use config::{load_app_config, load_app_config_from_env};
pub use corrections::{plan_corrections, CorrectionEntry, CorrectionPlan};
pub use coverage::{problem_type_counts, DriverAssignmentCoverage, ProblemTypeCoverage};
pub use routes::{RouteDriver, RouteSchedule, StartingLocation};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised by the pure batch and route-planning logic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid coordinate ({lat}, {lng}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("no address with original index {0} in this batch")]
    UnknownAddress(usize),

    #[error("original index {0} appears more than once in the batch")]
    DuplicateIndex(usize),

    #[error("address batch is empty")]
    EmptyBatch,

    /// Informational: the user submitted the correction form without
    /// changing anything.
    #[error("no corrections were made; proceed with the current addresses to continue as-is")]
    NoCorrections,

    #[error("invalid route schedule: {0}")]
    InvalidSchedule(String),

    #[error("route date and time {0} is not in the future")]
    ScheduleInPast(String),

    #[error("at least one driver must be selected")]
    NoDrivers,

    #[error("an email or username is required")]
    MissingIdentity,
}

impl CoreError {
    /// `true` for conditions the UI should show as a notice rather than a
    /// failure.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, CoreError::NoCorrections)
    }
}
