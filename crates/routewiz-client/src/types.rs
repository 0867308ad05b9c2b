//! Request and response bodies for the route-planning backend.
//!
//! Every response carries a `success` flag. Job-start endpoints answer
//! immediately with a `job_id`; the work itself is reported through the
//! status endpoints as a [`JobStatusBody`] whose `result` holds one of the
//! `*Result` types below.

use routewiz_core::{
    resolve_result_rows, AddressRecord, Confidence, DriverAssignmentCoverage, ManualCoordinate,
    RawAddress, ResultRow, RouteDriver,
};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A backend account (the dispatcher or one of their drivers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_email: String,
    #[serde(default)]
    pub member_first_name: String,
    #[serde(default)]
    pub member_last_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Member {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.member_first_name, self.member_last_name)
            .trim()
            .to_owned()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateUserRequest<'a> {
    pub username: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ValidateUserResponse {
    pub success: bool,
    pub user: Option<Member>,
    #[serde(default)]
    pub sub_drivers: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub addresses: Vec<RawAddress>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateAddressesRequest<'a> {
    pub username: &'a str,
    pub addresses: &'a [AddressRecord],
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobStartResponse {
    #[serde(default)]
    pub success: bool,
    pub job_id: Option<String>,
}

/// Raw body of `GET /validation-status/{id}` and `GET /route-status/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusBody {
    pub status: String,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Terminal and non-terminal job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Processing,
    Completed,
    Failed,
}

impl JobStatusBody {
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownJobStatus`] for any status string other
    /// than `processing`, `completed` or `failed`.
    pub fn state(&self) -> Result<JobState, ClientError> {
        match self.status.as_str() {
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(ClientError::UnknownJobStatus(other.to_owned())),
        }
    }

    /// Progress clamped to `0..=100`; absent progress reads as 0.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = self
            .progress
            .filter(|p| p.is_finite())
            .map_or(0, |p| p.clamp(0.0, 100.0).round() as u8);
        percent
    }
}

/// Result of an initial validation job.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(default)]
    pub valid_count: usize,
    #[serde(default)]
    pub invalid_count: usize,
    #[serde(default)]
    pub valid_addresses: Vec<ResultRow>,
    #[serde(default)]
    pub invalid_addresses: Vec<ResultRow>,
}

/// Result of a retry-geocoding job.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryGeocodingResult {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<RetryRecord>,
}

/// One re-geocoded address. `status` is `"success"` when the geocoder found
/// the address at all; its confidence is only meaningful in that case.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryRecord {
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "originalIndex")]
    pub original_index: Option<usize>,
    #[serde(flatten)]
    pub fields: RawAddress,
}

impl RetryRecord {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// The address as it should enter the batch. A failed lookup keeps its
    /// fields but loses any confidence claim. `status` is not carried over.
    #[must_use]
    pub fn into_row(self) -> ResultRow {
        let succeeded = self.is_success();
        let mut fields = self.fields;
        if !succeeded {
            fields.confidence = Confidence::Unknown;
        }
        ResultRow {
            original_index: self.original_index,
            fields,
        }
    }
}

/// A terminal result from either kind of geocoding job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Validation(ValidationResult),
    RetryGeocoding(RetryGeocodingResult),
}

impl JobOutcome {
    /// Every address carried by the result, each tied to a batch position,
    /// ready for
    /// [`AddressBatchState::reconcile`](routewiz_core::AddressBatchState::reconcile).
    ///
    /// `submitted` is what the job was sent, in request order. It resolves
    /// rows that come back without `originalIndex`; see
    /// [`resolve_result_rows`].
    #[must_use]
    pub fn records(&self, submitted: &[AddressRecord]) -> Vec<AddressRecord> {
        let rows: Vec<ResultRow> = match self {
            JobOutcome::Validation(result) => result
                .valid_addresses
                .iter()
                .chain(&result.invalid_addresses)
                .cloned()
                .collect(),
            JobOutcome::RetryGeocoding(result) => result
                .results
                .iter()
                .cloned()
                .map(RetryRecord::into_row)
                .collect(),
        };
        resolve_result_rows(submitted, rows)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ManualCoordinatesPayload {
    pub lat: f64,
    pub lng: f64,
    pub manually_adjusted: bool,
}

impl From<ManualCoordinate> for ManualCoordinatesPayload {
    fn from(c: ManualCoordinate) -> Self {
        Self {
            lat: c.lat,
            lng: c.lng,
            manually_adjusted: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectedAddressPayload {
    pub original_data: AddressRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_coordinates: Option<ManualCoordinatesPayload>,
}

impl From<routewiz_core::CorrectionEntry> for CorrectedAddressPayload {
    fn from(entry: routewiz_core::CorrectionEntry) -> Self {
        Self {
            original_data: entry.original,
            corrected_address: entry.corrected_address,
            manual_coordinates: entry.manual_coordinates.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RetryGeocodingRequest<'a> {
    pub username: &'a str,
    pub corrected_addresses: &'a [CorrectedAddressPayload],
}

#[derive(Debug, Serialize)]
pub(crate) struct DriverAssignmentRequest<'a> {
    pub selected_drivers: &'a [String],
    pub addresses: &'a [AddressRecord],
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverAssignmentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(flatten)]
    pub report: DriverAssignmentCoverage,
}

#[derive(Debug, Serialize)]
pub struct CreateRoutesRequest<'a> {
    pub username: &'a str,
    pub selected_drivers: &'a [RouteDriver],
    pub addresses: &'a [AddressRecord],
    pub route_date: String,
    pub route_time: String,
}

/// Result of a route-creation job.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteCreationResult {
    pub success: bool,
    #[serde(default)]
    pub total_routes: u32,
    #[serde(default)]
    pub created_routes: Vec<CreatedRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRoute {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub status: String,
    pub starting_location: Option<String>,
    pub addresses_count: Option<u32>,
    pub error: Option<String>,
}

impl CreatedRoute {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_body(value: serde_json::Value) -> JobStatusBody {
        serde_json::from_value(value).expect("valid status body")
    }

    #[test]
    fn job_state_rejects_unknown_status() {
        let body = status_body(serde_json::json!({ "status": "queued" }));
        assert!(matches!(body.state(), Err(ClientError::UnknownJobStatus(ref s)) if s == "queued"));
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(
            status_body(serde_json::json!({ "status": "processing", "progress": 140 }))
                .progress_percent(),
            100
        );
        assert_eq!(
            status_body(serde_json::json!({ "status": "processing", "progress": 42.6 }))
                .progress_percent(),
            43
        );
        assert_eq!(
            status_body(serde_json::json!({ "status": "processing" })).progress_percent(),
            0
        );
    }

    #[test]
    fn failed_retry_record_loses_confidence() {
        let record: RetryRecord = serde_json::from_value(serde_json::json!({
            "status": "error",
            "confidence": "high",
            "address": "1 Elm St",
            "originalIndex": 3
        }))
        .unwrap();
        assert!(!record.is_success());

        let row = record.into_row();
        assert_eq!(row.original_index, Some(3));
        assert_eq!(row.fields.confidence, Confidence::Unknown);
    }

    #[test]
    fn retry_status_stays_out_of_record_fields() {
        let record: RetryRecord = serde_json::from_value(serde_json::json!({
            "status": "success",
            "confidence": "high",
            "address": "1 Elm St",
            "formatted_address": "1 Elm Street",
            "originalIndex": 0
        }))
        .unwrap();

        let row = record.into_row();
        assert!(!row.fields.extra.contains_key("status"));
        assert!(row.fields.extra.contains_key("formatted_address"));

        let json = serde_json::to_value(row.fields.into_record(0)).unwrap();
        assert!(json.get("status").is_none());
    }

    fn submitted() -> Vec<AddressRecord> {
        routewiz_core::index_upload(
            serde_json::from_value(serde_json::json!([
                { "address": "1 Elm St" },
                { "address": "2 Oak Ave" }
            ]))
            .unwrap(),
        )
    }

    #[test]
    fn retry_outcome_yields_all_records() {
        let result: RetryGeocodingResult = serde_json::from_value(serde_json::json!({
            "success": true,
            "results": [
                { "status": "success", "confidence": "high", "address": "1 Elm St", "originalIndex": 0 },
                { "status": "success", "confidence": "low", "address": "2 Oak Ave", "originalIndex": 1 }
            ]
        }))
        .unwrap();

        let records = JobOutcome::RetryGeocoding(result).records(&submitted());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].confidence, Confidence::High);
        assert_eq!(records[1].confidence, Confidence::Low);
    }

    #[test]
    fn validation_result_decodes_without_original_index() {
        let result: ValidationResult = serde_json::from_value(serde_json::json!({
            "success": true,
            "valid_count": 1,
            "invalid_count": 1,
            "valid_addresses": [{ "address": "2 Oak Ave", "confidence": "high" }],
            "invalid_addresses": [{ "address": "1 Elm St", "confidence": "low" }]
        }))
        .expect("rows without originalIndex should decode");

        let records = JobOutcome::Validation(result).records(&submitted());
        let by_index: Vec<(usize, Confidence)> = records
            .iter()
            .map(|r| (r.original_index, r.confidence))
            .collect();
        assert_eq!(by_index, vec![(1, Confidence::High), (0, Confidence::Low)]);
    }

    #[test]
    fn correction_payload_omits_absent_fields() {
        let payload = CorrectedAddressPayload {
            original_data: serde_json::from_value(serde_json::json!({
                "address": "123 Main St",
                "originalIndex": 2
            }))
            .unwrap(),
            corrected_address: None,
            manual_coordinates: Some(ManualCoordinate { lat: 1.5, lng: 2.5 }.into()),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("corrected_address").is_none());
        assert_eq!(json["manual_coordinates"]["manually_adjusted"], true);
        assert_eq!(json["original_data"]["originalIndex"], 2);
    }
}
