//! Step-by-step scenario playback as a plain state machine.
//!
//! The player never touches a clock itself; a driver (see `playback`, behind
//! the `async` feature) calls [`StepPlayer::tick`] on a fixed interval and
//! passes in the elapsed time.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::history::RunRecord;
use crate::status::{TestId, TestStatus};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 500;

/// Playback pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub tick_interval_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl PlayerConfig {
    /// Tick period, never shorter than one millisecond.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Fixture the player animates. The terminal status is declared up front,
/// so replaying a scenario always ends the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub test_id: TestId,
    pub label: String,
    pub steps: Vec<String>,
    pub terminal_status: TestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Running {
        current_step: usize,
        step_count: usize,
    },
    Completed {
        status: TestStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A run was already in progress; nothing changed
    Ignored,
}

/// Incremental progress emitted on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub test_id: TestId,
    pub current_step: usize,
    pub step_count: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Progress(Progress),
    /// Final tick: carries the last progress update and the run record
    Completed {
        progress: Progress,
        record: RunRecord,
    },
}

#[derive(Debug, Clone)]
pub struct StepPlayer {
    state: PlayerState,
    scenario: Option<Scenario>,
}

impl Default for StepPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepPlayer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            scenario: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PlayerState {
        &self.state
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, PlayerState::Running { .. })
    }

    #[must_use]
    pub fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    /// Begin playing `scenario` from step 0. Ignored while a run is in progress.
    pub fn start(&mut self, scenario: Scenario) -> StartOutcome {
        if self.is_running() {
            log::debug!(
                "start {} ignored: player already running",
                scenario.test_id
            );
            return StartOutcome::Ignored;
        }
        log::debug!(
            "start {} ({} steps)",
            scenario.test_id,
            scenario.steps.len()
        );
        self.state = PlayerState::Running {
            current_step: 0,
            step_count: scenario.steps.len(),
        };
        self.scenario = Some(scenario);
        StartOutcome::Started
    }

    /// Advance one step. Returns `None` unless the player is running.
    pub fn tick(&mut self, elapsed: Duration) -> Option<TickOutcome> {
        let PlayerState::Running {
            current_step,
            step_count,
        } = self.state
        else {
            return None;
        };
        let scenario = self.scenario.as_ref()?;

        let current_step = current_step + 1;
        let progress = Progress {
            test_id: scenario.test_id.clone(),
            current_step: current_step.min(step_count),
            step_count,
            percent: progress_percent(current_step, step_count),
        };

        if current_step < step_count {
            self.state = PlayerState::Running {
                current_step,
                step_count,
            };
            return Some(TickOutcome::Progress(progress));
        }

        let record = RunRecord {
            test_id: scenario.test_id.clone(),
            label: scenario.label.clone(),
            terminal_status: scenario.terminal_status,
            elapsed,
        };
        log::debug!(
            "completed {} -> {} after {elapsed:?}",
            record.test_id,
            record.terminal_status
        );
        self.state = PlayerState::Completed {
            status: scenario.terminal_status,
        };
        Some(TickOutcome::Completed { progress, record })
    }

    /// Stop any run in progress. Returns whether a run was interrupted.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        if was_running {
            log::debug!(
                "cancelled {}",
                self.scenario.as_ref().map_or("-", |s| s.test_id.as_str())
            );
        }
        self.state = PlayerState::Idle;
        self.scenario = None;
        was_running
    }
}

/// `round(step / count * 100)`, capped at 100; an empty scenario is 100% on its only tick.
#[must_use]
pub const fn progress_percent(step: usize, count: usize) -> u32 {
    if count == 0 || step >= count {
        return 100;
    }
    ((step * 200 + count) / (count * 2)) as u32
}
