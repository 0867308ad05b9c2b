//! Driver capability coverage for the problem types in a batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::AddressRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemTypeCoverage {
    /// Selected drivers able to handle this problem type.
    pub count: u32,
    pub addresses_count: u32,
}

/// Advisory report from the backend. Never blocks the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DriverAssignmentCoverage {
    #[serde(default)]
    pub coverage: BTreeMap<String, ProblemTypeCoverage>,
    #[serde(default)]
    pub fully_covered: bool,
    #[serde(default)]
    pub uncovered_types: Vec<String>,
}

impl DriverAssignmentCoverage {
    /// Problem types no selected driver can serve.
    ///
    /// The backend's `uncovered_types` list is authoritative. When it is
    /// empty but the report is not fully covered, the list is derived from
    /// the per-type table (no capable driver, at least one address).
    #[must_use]
    pub fn uncovered(&self) -> Vec<&str> {
        if !self.uncovered_types.is_empty() || self.fully_covered {
            return self.uncovered_types.iter().map(String::as_str).collect();
        }
        self.coverage
            .iter()
            .filter(|(_, c)| c.count == 0 && c.addresses_count > 0)
            .map(|(t, _)| t.as_str())
            .collect()
    }
}

/// Number of addresses per problem type, for the route summary.
#[must_use]
pub fn problem_type_counts(addresses: &[AddressRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for address in addresses {
        *counts.entry(address.problem_type.clone()).or_insert(0) += 1;
    }
    counts
}
