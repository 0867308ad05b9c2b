//! The working set for one upload-correction cycle.
//!
//! [`AddressBatchState`] holds every uploaded address split into a valid and
//! an invalid list, plus the user's manual pins. It is owned by exactly one
//! wizard flow and passed explicitly between steps.
//!
//! Correlation is by `original_index` only. Records are merged through a
//! `BTreeMap` keyed on that index, so both lists come out sorted by it and a
//! record can never be lost or duplicated across rounds.

use std::collections::BTreeMap;

use crate::address::{AddressRecord, Confidence, ManualCoordinate};
use crate::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct AddressBatchState {
    valid_addresses: Vec<AddressRecord>,
    invalid_addresses: Vec<AddressRecord>,
    manual_coordinates: BTreeMap<usize, ManualCoordinate>,
}

/// Counts shown to the user when the batch is handed to route creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub total: usize,
    pub manually_adjusted: usize,
    pub low_confidence: usize,
}

impl std::fmt::Display for FinalizeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Proceeding with {} addresses", self.total)?;
        match (self.manually_adjusted, self.low_confidence) {
            (0, 0) => Ok(()),
            (0, low) => write!(f, " ({low} with low confidence)"),
            (manual, 0) => write!(f, " ({manual} manually adjusted)"),
            (manual, low) => write!(
                f,
                " ({manual} manually adjusted, {low} with low confidence)"
            ),
        }
    }
}

impl AddressBatchState {
    /// Builds the initial state from an indexed upload.
    ///
    /// Records are classified by their current confidence; a fresh upload
    /// normally has none, so everything starts out invalid.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyBatch`] if `records` is empty.
    /// - [`CoreError::DuplicateIndex`] if two records share an `original_index`.
    pub fn from_upload(records: Vec<AddressRecord>) -> Result<Self, CoreError> {
        if records.is_empty() {
            return Err(CoreError::EmptyBatch);
        }

        let mut by_index = BTreeMap::new();
        for record in records {
            let index = record.original_index;
            if by_index.insert(index, record).is_some() {
                return Err(CoreError::DuplicateIndex(index));
            }
        }

        let manual_coordinates = BTreeMap::new();
        let (valid_addresses, invalid_addresses) = classify(by_index, &manual_coordinates);
        Ok(Self {
            valid_addresses,
            invalid_addresses,
            manual_coordinates,
        })
    }

    #[must_use]
    pub fn valid_addresses(&self) -> &[AddressRecord] {
        &self.valid_addresses
    }

    #[must_use]
    pub fn invalid_addresses(&self) -> &[AddressRecord] {
        &self.invalid_addresses
    }

    #[must_use]
    pub fn manual_coordinates(&self) -> &BTreeMap<usize, ManualCoordinate> {
        &self.manual_coordinates
    }

    /// Total number of addresses in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.valid_addresses.len() + self.invalid_addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` once no address needs user attention.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.invalid_addresses.is_empty()
    }

    /// Looks up an address by its upload position in either list.
    #[must_use]
    pub fn get(&self, original_index: usize) -> Option<&AddressRecord> {
        self.valid_addresses
            .iter()
            .chain(&self.invalid_addresses)
            .find(|r| r.original_index == original_index)
    }

    /// Records a manual pin for one address.
    ///
    /// The address is not moved between lists here; that happens on the next
    /// [`reconcile`](Self::reconcile) or [`finalize`](Self::finalize).
    /// A later pin for the same address replaces the earlier one.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidCoordinate`] if the coordinate is out of range.
    /// - [`CoreError::UnknownAddress`] if no address has `original_index`.
    pub fn apply_manual_coordinate(
        &mut self,
        original_index: usize,
        lat: f64,
        lng: f64,
    ) -> Result<(), CoreError> {
        let coordinate = ManualCoordinate::new(lat, lng)?;
        if self.get(original_index).is_none() {
            return Err(CoreError::UnknownAddress(original_index));
        }
        tracing::debug!(original_index, lat, lng, "manual coordinate recorded");
        self.manual_coordinates.insert(original_index, coordinate);
        Ok(())
    }

    /// Merges a job's records into the batch and reclassifies everything.
    ///
    /// Each incoming record replaces the stored record with the same
    /// `original_index`; indices unknown to the batch are dropped. Manual
    /// pins are then applied on top, so a pin always beats the geocoder.
    /// Finally every record is split on [`Confidence::is_routable`].
    ///
    /// Pure: the same state and the same records always produce the same
    /// result, and reconciling a result against itself is a no-op.
    #[must_use]
    pub fn reconcile(&self, results: &[AddressRecord]) -> Self {
        let mut by_index: BTreeMap<usize, AddressRecord> = self
            .valid_addresses
            .iter()
            .chain(&self.invalid_addresses)
            .map(|r| (r.original_index, r.clone()))
            .collect();

        for record in results {
            match by_index.get_mut(&record.original_index) {
                Some(slot) => slot.clone_from(record),
                None => tracing::warn!(
                    original_index = record.original_index,
                    address = %record.address,
                    "dropping result for an address that is not in this batch"
                ),
            }
        }

        let (valid_addresses, invalid_addresses) = classify(by_index, &self.manual_coordinates);
        Self {
            valid_addresses,
            invalid_addresses,
            manual_coordinates: self.manual_coordinates.clone(),
        }
    }

    /// Counts for the "proceeding with N addresses" notice, after pins are
    /// applied.
    #[must_use]
    pub fn summary(&self) -> FinalizeSummary {
        let settled = self.reconcile(&[]);
        FinalizeSummary {
            total: settled.len(),
            manually_adjusted: settled
                .valid_addresses
                .iter()
                .filter(|r| r.confidence == Confidence::ManuallyAdjusted)
                .count(),
            low_confidence: settled.invalid_addresses.len(),
        }
    }

    /// Flattens the batch into the list handed to route creation.
    ///
    /// Pending pins are applied first. Addresses still invalid are included
    /// as-is: finalizing means the user accepted them. The result is ordered
    /// by `original_index` and always has [`len`](Self::len) entries.
    #[must_use]
    pub fn finalize(self) -> Vec<AddressRecord> {
        let settled = self.reconcile(&[]);
        let mut all = settled.valid_addresses;
        all.extend(settled.invalid_addresses);
        all.sort_by_key(|r| r.original_index);
        all
    }
}

fn classify(
    records: BTreeMap<usize, AddressRecord>,
    manual: &BTreeMap<usize, ManualCoordinate>,
) -> (Vec<AddressRecord>, Vec<AddressRecord>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for (index, mut record) in records {
        if let Some(coordinate) = manual.get(&index) {
            record.apply_manual(*coordinate);
        }
        if record.confidence.is_routable() {
            valid.push(record);
        } else {
            invalid.push(record);
        }
    }
    (valid, invalid)
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
