//! Fetch, filter and tabulate the backend log feeds.
use bankqa_logs::{
    DateRange, FetchError, FieldFilter, FilterSet, LoadStatus, LogSource, LogicalField, RawRecord,
    RecordFetcher, RecordReconciler, SourceSummary, is_session_active, mask_token,
    parse_timestamp, stringify,
};
use serde::Serialize;
use std::sync::Arc;

/// Operator filter input shared by every feed.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub search: String,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub category: Option<String>,
}

impl LogQuery {
    /// Filters for one feed. The category value only applies to feeds that have one.
    pub fn filters_for(&self, source: LogSource) -> FilterSet {
        let field = match (source.category_field(), self.category.as_deref()) {
            (Some(field), Some(value)) => Some(FieldFilter::new(field, value)),
            (None, Some(value)) => {
                log::debug!("{source} has no category filter; ignoring '{value}'");
                None
            }
            _ => None,
        };
        FilterSet {
            search: self.search.clone(),
            date_range: DateRange::from_inputs(self.date_from.as_deref(), self.date_to.as_deref()),
            field,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: LogSource,
    pub label: &'static str,
    pub status: &'static str,
    pub error: Option<String>,
    /// Whether a retry can succeed without any change on our side
    pub retryable: bool,
    pub fetched: usize,
    pub summary: SourceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_sessions: Option<usize>,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl SourceReport {
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Fetch `sources` concurrently and build one report per feed, in order.
pub async fn inspect_logs(
    fetcher: Arc<dyn RecordFetcher>,
    sources: &[LogSource],
    query: &LogQuery,
) -> Vec<SourceReport> {
    let mut reconciler = RecordReconciler::new(fetcher);
    reconciler.fetch_all(sources).await;
    sources
        .iter()
        .map(|source| build_report(&reconciler, *source, &query.filters_for(*source)))
        .collect()
}

fn build_report(reconciler: &RecordReconciler, source: LogSource, filters: &FilterSet) -> SourceReport {
    let view = reconciler.view(source);
    let rows = reconciler.filtered(source, filters);
    let status = match &view.status {
        LoadStatus::Idle => "idle",
        LoadStatus::Loading => "loading",
        LoadStatus::Loaded => "loaded",
        LoadStatus::Failed(_) => "failed",
    };
    let active_sessions = (source == LogSource::Session)
        .then(|| rows.iter().filter(|r| is_session_active(r)).count());
    SourceReport {
        source,
        label: source.label(),
        status,
        error: view.status.error().map(ToString::to_string),
        retryable: view.status.error().is_some_and(FetchError::is_transient),
        fetched: view.records.len(),
        summary: SourceSummary::from_records(rows.iter().copied()),
        active_sessions,
        columns: source.columns().iter().map(|c| c.heading()).collect(),
        rows: rows
            .iter()
            .map(|record| render_row(source, record))
            .collect(),
    }
}

/// Display cells for `record`, one per column of `source`.
pub fn render_row(source: LogSource, record: &RawRecord) -> Vec<String> {
    source
        .columns()
        .iter()
        .map(|field| render_cell(*field, record))
        .collect()
}

fn render_cell(field: LogicalField, record: &RawRecord) -> String {
    match field {
        LogicalField::SessionToken => {
            let token = record.lookup(field).map(stringify);
            mask_token(token.as_deref())
        }
        LogicalField::Timestamp | LogicalField::LoginTime | LogicalField::LogoutTime => record
            .lookup(field)
            .and_then(parse_timestamp)
            .map_or_else(
                || record.resolve(field),
                |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        _ => record.resolve(field),
    }
}
