//! Append-only log of completed scenario playbacks.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::status::{TestId, TestStatus};

/// One completed simulated execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub test_id: TestId,
    pub label: String,
    pub terminal_status: TestStatus,
    #[serde(with = "duration_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

/// Completed runs in insertion order (oldest first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHistory {
    records: Vec<RunRecord>,
}

impl RunHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: RunRecord) {
        log::debug!(
            "run recorded: {} -> {} in {:?}",
            record.test_id,
            record.terminal_status,
            record.elapsed
        );
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    #[must_use]
    pub fn latest(&self) -> Option<&RunRecord> {
        self.records.last()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.iter().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
