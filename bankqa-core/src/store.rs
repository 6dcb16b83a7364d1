//! In-memory result store shared by every dashboard view.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::status::{TestId, TestStatus, ToggleVariant};

/// Current status of every addressable test.
///
/// A missing key means `Untested`; the map never stores `Untested` explicitly.
/// Every mutation bumps `revision`, which lets memoised views notice change
/// without comparing the whole map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultStore {
    results: BTreeMap<TestId, TestStatus>,
    #[serde(skip)]
    revision: u64,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self, test_id: &str) -> TestStatus {
        self.results.get(test_id).copied().unwrap_or_default()
    }

    /// Advance `test_id` one step through `variant`'s cycle and return the new status.
    pub fn toggle(&mut self, test_id: &str, variant: ToggleVariant) -> TestStatus {
        let current = self.status(test_id);
        let next = variant.next(current);
        log::debug!("toggle {test_id} ({variant}): {current} -> {next}");
        self.write(test_id, next);
        next
    }

    /// Overwrite the status of `test_id` without walking a cycle.
    pub fn set(&mut self, test_id: &str, status: TestStatus) {
        log::debug!("set {test_id} = {status}");
        self.write(test_id, status);
    }

    /// Forget every recorded status.
    pub fn reset_all(&mut self) {
        log::debug!("reset all ({} recorded results)", self.results.len());
        self.results.clear();
        self.bump();
    }

    /// Monotonic mutation counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of tests holding a non-`Untested` status.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn count(&self, status: TestStatus) -> usize {
        self.results.values().filter(|s| **s == status).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TestStatus)> {
        self.results.iter().map(|(id, status)| (id.as_str(), *status))
    }

    fn write(&mut self, test_id: &str, status: TestStatus) {
        if status.is_tested() {
            self.results.insert(test_id.to_string(), status);
        } else {
            self.results.remove(test_id);
        }
        self.bump();
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
