//! Turns the correction form into a retry-geocoding payload.

use std::collections::BTreeMap;

use crate::address::{AddressRecord, ManualCoordinate};
use crate::batch::AddressBatchState;
use crate::CoreError;

/// One invalid address the user changed, either by editing its text or by
/// placing a pin (or both).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionEntry {
    pub original: AddressRecord,
    pub corrected_address: Option<String>,
    pub manual_coordinates: Option<ManualCoordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionPlan {
    /// Addresses to re-send, in `original_index` order.
    pub entries: Vec<CorrectionEntry>,
    /// Invalid addresses left untouched. They are not re-sent and stay
    /// invalid in the next round.
    pub unchanged: Vec<usize>,
}

/// Decides which invalid addresses go into a retry-geocoding request.
///
/// `corrected_text` maps `original_index` to whatever is in that address's
/// text field. A text change exists when the trimmed text is non-empty and
/// differs (case-sensitively) from the stored address. A coordinate change
/// exists when the batch holds a manual pin for the index. Addresses with
/// neither are left out.
///
/// # Errors
///
/// Returns [`CoreError::NoCorrections`] when nothing would be sent.
pub fn plan_corrections(
    state: &AddressBatchState,
    corrected_text: &BTreeMap<usize, String>,
) -> Result<CorrectionPlan, CoreError> {
    let mut entries = Vec::new();
    let mut unchanged = Vec::new();

    for address in state.invalid_addresses() {
        let index = address.original_index;
        let corrected_address = corrected_text
            .get(&index)
            .map(|text| text.trim())
            .filter(|text| !text.is_empty() && *text != address.address)
            .map(str::to_owned);
        let manual_coordinates = state.manual_coordinates().get(&index).copied();

        if corrected_address.is_none() && manual_coordinates.is_none() {
            unchanged.push(index);
            continue;
        }

        entries.push(CorrectionEntry {
            original: address.clone(),
            corrected_address,
            manual_coordinates,
        });
    }

    if entries.is_empty() {
        return Err(CoreError::NoCorrections);
    }

    tracing::debug!(
        corrected = entries.len(),
        unchanged = unchanged.len(),
        "planned address corrections"
    );
    Ok(CorrectionPlan { entries, unchanged })
}
