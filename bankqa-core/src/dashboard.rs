//! Operator-facing session: one catalog, one result store, one player.
use thiserror::Error;

use crate::catalog::Catalog;
use crate::history::{RunHistory, RunRecord};
use crate::playback::{PlaybackEvent, PlaybackHandle, spawn_playback};
use crate::player::{PlayerConfig, Progress, StartOutcome};
use crate::score::{ScoreAggregator, ScoreCache, ScoreSnapshot, Scorecard};
use crate::status::{TestId, TestStatus};
use crate::store::ResultStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("no test '{0}' in the catalog")]
    UnknownTest(TestId),
    #[error("no catalog node '{0}'")]
    UnknownNode(String),
}

/// Every operator action funnels through this type, which keeps a single
/// writer path into the [`ResultStore`].
#[derive(Debug)]
pub struct Dashboard {
    catalog: Catalog,
    store: ResultStore,
    history: RunHistory,
    config: PlayerConfig,
    scores: ScoreCache,
    playback: Option<PlaybackHandle>,
    progress: Option<Progress>,
}

impl Dashboard {
    #[must_use]
    pub fn new(catalog: Catalog, config: PlayerConfig) -> Self {
        Self {
            catalog,
            store: ResultStore::new(),
            history: RunHistory::new(),
            config,
            scores: ScoreCache::new(),
            playback: None,
            progress: None,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn store(&self) -> &ResultStore {
        &self.store
    }

    #[must_use]
    pub const fn history(&self) -> &RunHistory {
        &self.history
    }

    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self, test_id: &str) -> TestStatus {
        self.store.status(test_id)
    }

    /// Toggle using the cycle declared for `test_id` in the catalog.
    pub fn toggle(&mut self, test_id: &str) -> TestStatus {
        let variant = self.catalog.variant_of(test_id);
        self.store.toggle(test_id, variant)
    }

    pub fn set(&mut self, test_id: &str, status: TestStatus) {
        self.store.set(test_id, status);
    }

    /// Clear all results and stop any playback. Run history is kept.
    pub fn reset_all(&mut self) {
        self.cancel();
        self.store.reset_all();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| !p.is_finished())
    }

    /// Test currently being played back, if any.
    #[must_use]
    pub fn running_test(&self) -> Option<&str> {
        self.playback
            .as_ref()
            .filter(|p| !p.is_finished())
            .map(PlaybackHandle::test_id)
    }

    #[must_use]
    pub const fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Start animating `test_id`. Ignored while another playback runs.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if `test_id` is not in the catalog.
    pub fn start(&mut self, test_id: &str) -> Result<StartOutcome, DashboardError> {
        let scenario = self
            .catalog
            .find_test(test_id)
            .map(crate::catalog::TestCase::scenario)
            .ok_or_else(|| DashboardError::UnknownTest(test_id.to_string()))?;
        if self.is_running() {
            log::debug!("start {test_id} ignored: {:?} still running", self.running_test());
            return Ok(StartOutcome::Ignored);
        }
        self.progress = None;
        self.playback = Some(spawn_playback(scenario, &self.config));
        Ok(StartOutcome::Started)
    }

    /// Stop the active playback. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        if let Some(mut playback) = self.playback.take() {
            playback.cancel();
        }
        self.progress = None;
        was_running
    }

    /// Wait for the next playback event and apply it. `None` when nothing is running.
    pub async fn pump(&mut self) -> Option<PlaybackEvent> {
        let playback = self.playback.as_mut()?;
        let event = playback.next_event().await;
        match &event {
            Some(PlaybackEvent::Progress(progress)) => {
                self.progress = Some(progress.clone());
            }
            Some(PlaybackEvent::Completed(record)) => {
                self.store.set(&record.test_id, record.terminal_status);
                self.history.push(record.clone());
                self.playback = None;
            }
            None => {
                self.playback = None;
            }
        }
        event
    }

    /// Start `test_id` and drive it to completion, reporting progress to `on_progress`.
    ///
    /// Returns `Ok(None)` if another playback was already running.
    ///
    /// # Errors
    ///
    /// Returns an error if `test_id` is not in the catalog.
    pub async fn play(
        &mut self,
        test_id: &str,
        mut on_progress: impl FnMut(&Progress),
    ) -> Result<Option<RunRecord>, DashboardError> {
        if self.start(test_id)? == StartOutcome::Ignored {
            return Ok(None);
        }
        while let Some(event) = self.pump().await {
            match event {
                PlaybackEvent::Progress(progress) => on_progress(&progress),
                PlaybackEvent::Completed(record) => return Ok(Some(record)),
            }
        }
        Ok(None)
    }

    /// Snapshot of one catalog node.
    ///
    /// # Errors
    ///
    /// Returns an error if no node has id `node_id`.
    pub fn score(&self, node_id: &str) -> Result<ScoreSnapshot, DashboardError> {
        let node = self
            .catalog
            .find_node(node_id)
            .ok_or_else(|| DashboardError::UnknownNode(node_id.to_string()))?;
        Ok(ScoreAggregator::new(&self.store).score_node(node))
    }

    /// Full rollup tree, recomputed only when the store has changed.
    pub fn scorecard(&mut self) -> &Scorecard {
        self.scores.scorecard(&self.catalog, &self.store)
    }
}
