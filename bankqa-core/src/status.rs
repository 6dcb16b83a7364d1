//! Test outcomes and the toggle cycles that move between them.
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Opaque catalog key for a single test scenario.
pub type TestId = String;

/// Outcome recorded against a test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Never marked, or reset
    #[default]
    Untested,
    Pass,
    Fail,
    /// Only reachable through the ternary cycle (cross-environment grids)
    Partial,
}

impl TestStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Untested => "untested",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Partial => "partial",
        }
    }

    #[must_use]
    pub const fn is_tested(self) -> bool {
        !matches!(self, Self::Untested)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown test status '{0}' (expected untested, pass, fail or partial)")]
pub struct ParseStatusError(pub String);

impl FromStr for TestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "untested" | "none" | "" => Ok(Self::Untested),
            "pass" | "passed" => Ok(Self::Pass),
            "fail" | "failed" => Ok(Self::Fail),
            "partial" => Ok(Self::Partial),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

const BINARY_CYCLE: [TestStatus; 3] = [TestStatus::Untested, TestStatus::Pass, TestStatus::Fail];

const TERNARY_CYCLE: [TestStatus; 4] = [
    TestStatus::Untested,
    TestStatus::Pass,
    TestStatus::Fail,
    TestStatus::Partial,
];

/// Which cycle an operator toggle walks through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleVariant {
    /// untested -> pass -> fail -> untested
    #[default]
    Binary,
    /// untested -> pass -> fail -> partial -> untested
    Ternary,
}

impl ToggleVariant {
    /// Ordered states of this cycle, starting at `Untested`.
    #[must_use]
    pub const fn cycle(self) -> &'static [TestStatus] {
        match self {
            Self::Binary => &BINARY_CYCLE,
            Self::Ternary => &TERNARY_CYCLE,
        }
    }

    #[must_use]
    pub const fn cycle_len(self) -> usize {
        self.cycle().len()
    }

    #[must_use]
    pub fn allows(self, status: TestStatus) -> bool {
        self.cycle().contains(&status)
    }

    /// State that follows `current` in this cycle.
    ///
    /// A status outside the cycle (e.g. `Partial` under `Binary`, reachable
    /// only through a direct set) wraps back to `Untested`.
    #[must_use]
    pub fn next(self, current: TestStatus) -> TestStatus {
        let cycle = self.cycle();
        cycle
            .iter()
            .position(|status| *status == current)
            .map_or(TestStatus::Untested, |idx| cycle[(idx + 1) % cycle.len()])
    }
}

impl std::fmt::Display for ToggleVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Ternary => f.write_str("ternary"),
        }
    }
}
