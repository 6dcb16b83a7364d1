//! Timer-driven playback of a [`Scenario`] on the tokio runtime.
//!
//! One task per playback owns a [`StepPlayer`] and ticks it on a fixed
//! interval, so there is never more than one in-flight timer per player.
//! Events flow back through a channel; the consumer applies them.
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::history::RunRecord;
use crate::player::{PlayerConfig, Progress, Scenario, StepPlayer, TickOutcome};
use crate::status::TestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Progress(Progress),
    Completed(RunRecord),
}

/// Owner side of a running playback. Dropping the handle cancels it.
#[derive(Debug)]
pub struct PlaybackHandle {
    test_id: TestId,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

/// Spawn a playback task for `scenario`. Must be called inside a tokio runtime.
#[must_use]
pub fn spawn_playback(scenario: Scenario, config: &PlayerConfig) -> PlaybackHandle {
    let (events_tx, events) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let test_id = scenario.test_id.clone();
    let period = config.tick_interval();
    let task = tokio::spawn(run_playback_loop(scenario, period, events_tx, shutdown_rx));
    PlaybackHandle {
        test_id,
        events,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
        finished: false,
    }
}

impl PlaybackHandle {
    #[must_use]
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// True once the completion event has been delivered or the run was cancelled.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the next event. `None` after completion or cancellation.
    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(PlaybackEvent::Completed(_)) | None => self.finish(),
            Some(PlaybackEvent::Progress(_)) => {}
        }
        event
    }

    /// Stop the timer. Takes effect immediately: events already queued are discarded.
    pub fn cancel(&mut self) {
        if self.finished {
            return;
        }
        log::debug!("playback {} cancelled", self.test_id);
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.finish();
        while self.events.try_recv().is_ok() {}
    }

    fn finish(&mut self) {
        self.finished = true;
        self.events.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_playback_loop(
    scenario: Scenario,
    period: std::time::Duration,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let started = Instant::now();
    let mut player = StepPlayer::new();
    player.start(scenario);

    // First tick lands one full period after start, not immediately.
    let mut interval = tokio::time::interval_at(started + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                player.cancel();
                break;
            }
            _ = interval.tick() => {
                match player.tick(started.elapsed()) {
                    Some(TickOutcome::Progress(progress)) => {
                        if events_tx.send(PlaybackEvent::Progress(progress)).is_err() {
                            break;
                        }
                    }
                    Some(TickOutcome::Completed { progress, record }) => {
                        let _ = events_tx.send(PlaybackEvent::Progress(progress));
                        let _ = events_tx.send(PlaybackEvent::Completed(record));
                        break;
                    }
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TestStatus;
    use std::time::Duration;

    fn scenario(steps: usize) -> Scenario {
        Scenario {
            test_id: "A11Y-07".to_string(),
            label: "Progress bar announces updates".to_string(),
            steps: (0..steps).map(|n| format!("step {n}")).collect(),
            terminal_status: TestStatus::Pass,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn four_steps_complete_after_two_seconds() {
        let mut handle = spawn_playback(scenario(4), &PlayerConfig::default());
        let mut percents = Vec::new();
        let mut record = None;
        while let Some(event) = handle.next_event().await {
            match event {
                PlaybackEvent::Progress(p) => percents.push(p.percent),
                PlaybackEvent::Completed(r) => record = Some(r),
            }
        }
        assert_eq!(percents, vec![25, 50, 75, 100]);
        let record = record.expect("completion event");
        assert_eq!(record.elapsed, Duration::from_millis(2000));
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_events() {
        let mut handle = spawn_playback(scenario(4), &PlayerConfig::default());
        let first = handle.next_event().await;
        assert!(matches!(first, Some(PlaybackEvent::Progress(ref p)) if p.current_step == 1));

        handle.cancel();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_interval_is_respected() {
        let config = PlayerConfig {
            tick_interval_ms: 100,
        };
        let mut handle = spawn_playback(scenario(2), &config);
        let mut completed = None;
        while let Some(event) = handle.next_event().await {
            if let PlaybackEvent::Completed(r) = event {
                completed = Some(r);
            }
        }
        assert_eq!(completed.unwrap().elapsed, Duration::from_millis(200));
    }
}
