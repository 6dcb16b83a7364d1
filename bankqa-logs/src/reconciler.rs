//! Per-feed load state with retry and last-fetch-wins ordering.
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError, JoinHandle};

use crate::client::RecordFetcher;
use crate::error::FetchError;
use crate::filter::FilterSet;
use crate::record::{RawRecord, SourceSummary};
use crate::source::LogSource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(FetchError),
}

impl LoadStatus {
    #[must_use]
    pub const fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// What the operator sees for one feed. A failed refresh keeps the last good rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceView {
    pub records: Vec<RawRecord>,
    pub status: LoadStatus,
}

#[derive(Debug, Default)]
struct SourceSlot {
    view: SourceView,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Completion {
    source: LogSource,
    generation: u64,
    result: Result<Vec<RawRecord>, FetchError>,
}

/// Owns one slot per feed and applies fetch results as they land.
///
/// Requests spawn onto the ambient tokio runtime; results are only applied
/// from [`next_completion`](Self::next_completion), so all state changes
/// happen on the caller's task.
pub struct RecordReconciler {
    fetcher: Arc<dyn RecordFetcher>,
    slots: BTreeMap<LogSource, SourceSlot>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl std::fmt::Debug for RecordReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReconciler")
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl RecordReconciler {
    #[must_use]
    pub fn new(fetcher: Arc<dyn RecordFetcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let slots = LogSource::VARIANTS
            .into_iter()
            .map(|source| (source, SourceSlot::default()))
            .collect();
        Self {
            fetcher,
            slots,
            tx,
            rx,
        }
    }

    fn slot(&self, source: LogSource) -> &SourceSlot {
        &self.slots[&source]
    }

    fn slot_mut(&mut self, source: LogSource) -> &mut SourceSlot {
        self.slots.entry(source).or_default()
    }

    /// Issue a fetch for `source`, superseding any fetch already in flight for it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn request(&mut self, source: LogSource) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        let slot = self.slot_mut(source);
        if let Some(previous) = slot.task.take() {
            previous.abort();
            log::debug!("{source}: superseding fetch #{}", slot.generation);
        }
        slot.generation += 1;
        slot.view.status = LoadStatus::Loading;
        let generation = slot.generation;
        log::debug!("{source}: fetch #{generation} issued");
        slot.task = Some(tokio::spawn(async move {
            // The fetch runs in its own task so a panic still settles the feed.
            let inner = tokio::spawn(async move { fetcher.fetch(source).await });
            let _guard = AbortOnDrop(inner.abort_handle());
            let result = inner
                .await
                .unwrap_or_else(|err| Err(join_failure(source, &err)));
            let _ = tx.send(Completion {
                source,
                generation,
                result,
            });
        }));
    }

    /// Operator retry; identical to a fresh request.
    pub fn retry(&mut self, source: LogSource) {
        self.request(source);
    }

    #[must_use]
    pub fn is_loading(&self, source: LogSource) -> bool {
        self.slot(source).view.status == LoadStatus::Loading
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.view.status == LoadStatus::Loading)
            .count()
    }

    /// Wait for the next current-generation result and apply it.
    ///
    /// Returns the feed that settled, or `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<LogSource> {
        while self.in_flight() > 0 {
            let done = self.rx.recv().await?;
            let slot = self.slot_mut(done.source);
            if done.generation != slot.generation || slot.view.status != LoadStatus::Loading {
                log::debug!(
                    "{}: dropping stale result #{} (current #{})",
                    done.source,
                    done.generation,
                    slot.generation
                );
                continue;
            }
            slot.task = None;
            match done.result {
                Ok(records) => {
                    log::debug!("{}: loaded {} records", done.source, records.len());
                    slot.view.records = records;
                    slot.view.status = LoadStatus::Loaded;
                }
                Err(err) => {
                    log::warn!("{err}");
                    slot.view.status = LoadStatus::Failed(err);
                }
            }
            return Some(done.source);
        }
        None
    }

    /// Fetch one feed and wait for it to settle.
    pub async fn fetch(&mut self, source: LogSource) -> &SourceView {
        self.request(source);
        while self.is_loading(source) {
            if self.next_completion().await.is_none() {
                break;
            }
        }
        self.view(source)
    }

    /// Fetch several feeds concurrently and wait for all of them.
    pub async fn fetch_all(&mut self, sources: &[LogSource]) {
        for source in sources {
            self.request(*source);
        }
        while self.next_completion().await.is_some() {}
    }

    /// Abort every in-flight fetch. Feeds that were loading go back to idle.
    pub fn cancel_all(&mut self) {
        for slot in self.slots.values_mut() {
            if let Some(task) = slot.task.take() {
                task.abort();
                slot.generation += 1;
                slot.view.status = LoadStatus::Idle;
            }
        }
    }

    #[must_use]
    pub fn view(&self, source: LogSource) -> &SourceView {
        &self.slot(source).view
    }

    #[must_use]
    pub fn filtered(&self, source: LogSource, filters: &FilterSet) -> Vec<&RawRecord> {
        filters.apply(&self.view(source).records)
    }

    #[must_use]
    pub fn summary(&self, source: LogSource, filters: &FilterSet) -> SourceSummary {
        SourceSummary::from_records(self.filtered(source, filters))
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn join_failure(source: LogSource, err: &JoinError) -> FetchError {
    let message = if err.is_panic() {
        "fetch task panicked".to_string()
    } else {
        "fetch task was cancelled".to_string()
    };
    FetchError::Transport {
        feed: source,
        message,
    }
}

impl Drop for RecordReconciler {
    fn drop(&mut self) {
        for slot in self.slots.values_mut() {
            if let Some(task) = slot.task.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    type Reply = (Duration, Result<Vec<RawRecord>, FetchError>);

    /// Hands out scripted replies in call order, each after its own delay.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Reply>>,
    }

    impl Scripted {
        fn with(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl RecordFetcher for Scripted {
        async fn fetch(&self, _source: LogSource) -> Result<Vec<RawRecord>, FetchError> {
            let reply = self.replies.lock().unwrap().pop_front();
            let (delay, result) = reply.unwrap_or((Duration::ZERO, Ok(Vec::new())));
            tokio::time::sleep(delay).await;
            result
        }
    }

    fn named(name: &str) -> Vec<RawRecord> {
        vec![RawRecord::from_value(json!({"customer_name": name, "status": "success"})).unwrap()]
    }

    #[tokio::test(start_paused = true)]
    async fn later_request_wins_over_slower_earlier_one() {
        let fetcher = Scripted::with(vec![
            (Duration::from_secs(5), Ok(named("stale"))),
            (Duration::from_secs(1), Ok(named("fresh"))),
        ]);
        let mut reconciler = RecordReconciler::new(fetcher);
        reconciler.request(LogSource::Audit);
        tokio::time::sleep(Duration::from_millis(1)).await;
        reconciler.request(LogSource::Audit);

        assert_eq!(reconciler.next_completion().await, Some(LogSource::Audit));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(reconciler.next_completion().await, None);

        let view = reconciler.view(LogSource::Audit);
        assert_eq!(view.status, LoadStatus::Loaded);
        assert_eq!(view.records, named("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_rows_and_retry_recovers() {
        let err = FetchError::Status {
            feed: LogSource::Session,
            status: 500,
        };
        let fetcher = Scripted::with(vec![
            (Duration::ZERO, Ok(named("first"))),
            (Duration::ZERO, Err(err.clone())),
            (Duration::ZERO, Ok(named("second"))),
        ]);
        let mut reconciler = RecordReconciler::new(fetcher);

        assert_eq!(reconciler.fetch(LogSource::Session).await.status, LoadStatus::Loaded);
        let failed = reconciler.fetch(LogSource::Session).await;
        assert_eq!(failed.status.error(), Some(&err));
        assert_eq!(failed.records, named("first"));

        reconciler.retry(LogSource::Session);
        reconciler.next_completion().await;
        assert_eq!(reconciler.view(LogSource::Session).records, named("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn feeds_load_independently() {
        let fetcher = Scripted::with(vec![
            (Duration::from_secs(3), Ok(named("slow"))),
            (Duration::from_millis(10), Ok(named("quick"))),
        ]);
        let mut reconciler = RecordReconciler::new(fetcher);
        reconciler.request(LogSource::Operation);
        tokio::time::sleep(Duration::from_millis(1)).await;
        reconciler.request(LogSource::Notification);
        assert_eq!(reconciler.in_flight(), 2);

        assert_eq!(reconciler.next_completion().await, Some(LogSource::Notification));
        assert!(reconciler.is_loading(LogSource::Operation));
        assert_eq!(reconciler.next_completion().await, Some(LogSource::Operation));
        assert_eq!(reconciler.view(LogSource::Audit).status, LoadStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_returns_loading_feeds_to_idle() {
        let fetcher = Scripted::with(vec![(Duration::from_secs(1), Ok(named("never")))]);
        let mut reconciler = RecordReconciler::new(fetcher);
        reconciler.request(LogSource::Audit);
        reconciler.cancel_all();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(reconciler.next_completion().await, None);
        assert!(reconciler.view(LogSource::Audit).records.is_empty());
        assert_eq!(reconciler.view(LogSource::Audit).status, LoadStatus::Idle);
    }

    struct Panicking;

    #[async_trait]
    impl RecordFetcher for Panicking {
        async fn fetch(&self, source: LogSource) -> Result<Vec<RawRecord>, FetchError> {
            if source != LogSource::Notification {
                panic!("{source} fetcher blew up");
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn panicking_fetcher_settles_as_transport_error() {
        let mut reconciler = RecordReconciler::new(Arc::new(Panicking));
        tokio::time::timeout(
            Duration::from_secs(3),
            reconciler.fetch_all(&[LogSource::Audit, LogSource::Session, LogSource::Notification]),
        )
        .await
        .expect("fetch_all settles");
        assert_eq!(
            reconciler.view(LogSource::Notification).status,
            LoadStatus::Loaded
        );

        for source in [LogSource::Audit, LogSource::Session] {
            let view = reconciler.view(source);
            assert!(
                matches!(
                    view.status.error(),
                    Some(FetchError::Transport { feed, .. }) if *feed == source
                ),
                "{source}: {:?}",
                view.status
            );
            assert!(view.status.error().is_some_and(FetchError::is_transient));
        }
        assert_eq!(reconciler.in_flight(), 0);
    }

    #[tokio::test]
    async fn filtered_view_and_summary() {
        let rows = vec![
            RawRecord::from_value(json!({"operation_name": "transfer", "status": "success"})).unwrap(),
            RawRecord::from_value(json!({"operation_name": "transfer", "status": "failure"})).unwrap(),
            RawRecord::from_value(json!({"operation_name": "balance", "status": "success"})).unwrap(),
        ];
        let fetcher = Scripted::with(vec![(Duration::ZERO, Ok(rows))]);
        let mut reconciler = RecordReconciler::new(fetcher);
        reconciler.fetch(LogSource::Operation).await;

        let filters = FilterSet {
            search: "transfer".to_string(),
            ..FilterSet::default()
        };
        assert_eq!(reconciler.filtered(LogSource::Operation, &filters).len(), 2);
        let summary = reconciler.summary(LogSource::Operation, &filters);
        assert_eq!((summary.total, summary.succeeded, summary.failed), (2, 1, 1));
    }
}
