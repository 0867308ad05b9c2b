//! Address records as they move between the spreadsheet upload, the
//! geocoding backend, and route creation.
//!
//! ## Wire shape
//!
//! The backend echoes every field it was sent, so records are modelled as a
//! handful of typed fields plus an opaque `extra` map that is carried through
//! untouched. The correlation key is serialized as `originalIndex`; all other
//! fields are `snake_case`.
//!
//! ### `confidence`
//! The backend sends a free-form string. Only `"high"` and
//! `"manually_adjusted"` mean anything to routing; `"low"` is kept for
//! display, and anything else (including a missing or `null` field) decodes
//! as [`Confidence::Unknown`].

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// Geocoding certainty for one address.
///
/// Precedence, highest first: `ManuallyAdjusted`, `High`, `Low`, `Unknown`.
/// The derived ordering follows that precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
    ManuallyAdjusted,
    #[default]
    Unknown,
}

impl Confidence {
    /// Parses a backend confidence string. Never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            "manually_adjusted" => Confidence::ManuallyAdjusted,
            _ => Confidence::Unknown,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Confidence::ManuallyAdjusted => 3,
            Confidence::High => 2,
            Confidence::Low => 1,
            Confidence::Unknown => 0,
        }
    }

    /// Whether an address with this confidence can go straight to route
    /// creation without user review.
    #[must_use]
    pub fn is_routable(self) -> bool {
        matches!(self, Confidence::High | Confidence::ManuallyAdjusted)
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Confidence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Confidence::Unknown, Confidence::parse))
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Low => write!(f, "low"),
            Confidence::ManuallyAdjusted => write!(f, "manually_adjusted"),
            Confidence::Unknown => write!(f, "unknown"),
        }
    }
}

/// A user-placed map pin that overrides the geocoder's answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl ManualCoordinate {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] if `lat` is outside
    /// `[-90, 90]`, `lng` is outside `[-180, 180]`, or either is not finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lng_ok = lng.is_finite() && (-180.0..=180.0).contains(&lng);
        if lat_ok && lng_ok {
            Ok(Self { lat, lng })
        } else {
            Err(CoreError::InvalidCoordinate { lat, lng })
        }
    }
}

/// One row as returned by the spreadsheet upload, before it is indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAddress {
    #[serde(default)]
    pub builder_name: String,
    #[serde(default)]
    pub problem_type: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One address in a batch, keyed by its position in the original upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default)]
    pub builder_name: String,
    #[serde(default)]
    pub problem_type: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default)]
    pub confidence: Confidence,
    /// Position in the uploaded batch. Assigned once by [`index_upload`].
    #[serde(rename = "originalIndex")]
    pub original_index: usize,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AddressRecord {
    /// Replaces the geocoded position with a user-placed pin.
    pub fn apply_manual(&mut self, coordinate: ManualCoordinate) {
        self.lat = Some(coordinate.lat);
        self.lng = Some(coordinate.lng);
        self.confidence = Confidence::ManuallyAdjusted;
        self.extra
            .insert("manually_adjusted".to_owned(), serde_json::Value::Bool(true));
    }

    #[must_use]
    pub fn is_manually_adjusted(&self) -> bool {
        self.confidence == Confidence::ManuallyAdjusted
    }
}

impl RawAddress {
    /// Stamps the row with its batch position.
    ///
    /// Any `originalIndex` key left in the extra fields is discarded; the
    /// given position is authoritative.
    #[must_use]
    pub fn into_record(self, original_index: usize) -> AddressRecord {
        let mut extra = self.extra;
        extra.remove("originalIndex");
        AddressRecord {
            builder_name: self.builder_name,
            problem_type: self.problem_type,
            address: self.address,
            lat: self.lat,
            lng: self.lng,
            confidence: self.confidence,
            original_index,
            extra,
        }
    }

    fn same_source(&self, record: &AddressRecord) -> bool {
        self.address == record.address
            && self.builder_name == record.builder_name
            && self.problem_type == record.problem_type
    }
}

/// Assigns each uploaded row its permanent `original_index` (its position in
/// `raw`).
#[must_use]
pub fn index_upload(raw: Vec<RawAddress>) -> Vec<AddressRecord> {
    raw.into_iter()
        .enumerate()
        .map(|(original_index, row)| row.into_record(original_index))
        .collect()
}

/// One address as a geocoding job reports it. The backend may or may not
/// echo `originalIndex`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultRow {
    #[serde(default, rename = "originalIndex")]
    pub original_index: Option<usize>,
    #[serde(flatten)]
    pub fields: RawAddress,
}

/// Gives every job result row an `original_index`.
///
/// Rows that echo `originalIndex` keep it. A row without one claims the
/// first unclaimed record in `submitted` with the same address, builder and
/// problem type. Rows that still have no match then claim the first
/// unclaimed records of `submitted` in order. Rows left over after that are
/// dropped.
#[must_use]
pub fn resolve_result_rows(submitted: &[AddressRecord], rows: Vec<ResultRow>) -> Vec<AddressRecord> {
    let mut claimed: BTreeSet<usize> = rows.iter().filter_map(|r| r.original_index).collect();
    let mut resolved = Vec::with_capacity(rows.len());
    let mut unindexed = Vec::new();

    for row in rows {
        match row.original_index {
            Some(index) => resolved.push(row.fields.into_record(index)),
            None => unindexed.push(row.fields),
        }
    }

    let mut unmatched = Vec::new();
    for fields in unindexed {
        let hit = submitted
            .iter()
            .find(|r| !claimed.contains(&r.original_index) && fields.same_source(r))
            .map(|r| r.original_index);
        match hit {
            Some(index) => {
                claimed.insert(index);
                resolved.push(fields.into_record(index));
            }
            None => unmatched.push(fields),
        }
    }

    for fields in unmatched {
        let next = submitted
            .iter()
            .map(|r| r.original_index)
            .find(|index| !claimed.contains(index));
        match next {
            Some(index) => {
                tracing::warn!(
                    original_index = index,
                    address = %fields.address,
                    "result row has no originalIndex and no field match; assigned by position"
                );
                claimed.insert(index);
                resolved.push(fields.into_record(index));
            }
            None => tracing::warn!(
                address = %fields.address,
                "dropping result row that matches no submitted address"
            ),
        }
    }

    resolved
}
