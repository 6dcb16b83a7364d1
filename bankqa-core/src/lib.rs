//! Banking QA dashboard core
//!
//! Platform-agnostic state for the QA dashboard: the result store and its
//! toggle cycles, the catalog tree, hierarchical score rollups, run history
//! and the step player. The `async` feature adds a tokio playback driver and
//! the [`Dashboard`] session that ties everything together.

pub mod catalog;
pub mod history;
pub mod player;
pub mod score;
pub mod status;
pub mod store;

#[cfg(feature = "async")]
pub mod dashboard;
#[cfg(feature = "async")]
pub mod playback;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, CatalogNode, NodeKind, TestCase};
pub use history::{RunHistory, RunRecord};
pub use player::{
    DEFAULT_TICK_INTERVAL_MS, PlayerConfig, PlayerState, Progress, Scenario, StartOutcome,
    StepPlayer, TickOutcome, progress_percent,
};
pub use score::{NodeScore, ScoreAggregator, ScoreCache, ScoreSnapshot, Scorecard};
pub use status::{ParseStatusError, TestId, TestStatus, ToggleVariant};
pub use store::ResultStore;

#[cfg(feature = "async")]
pub use dashboard::{Dashboard, DashboardError};
#[cfg(feature = "async")]
pub use playback::{PlaybackEvent, PlaybackHandle, spawn_playback};
