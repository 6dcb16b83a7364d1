//! Log and audit feed reconciliation
//!
//! Fetches the four backend feeds (audit, operation flow, sessions,
//! notifications), resolves their inconsistent field names through one alias
//! table and filters the rows with a fixed search, date range and category
//! pipeline.

pub mod client;
pub mod error;
pub mod filter;
pub mod reconciler;
pub mod record;
pub mod source;

pub use client::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, HttpRecordFetcher, RecordFetcher,
};
pub use error::FetchError;
pub use filter::{
    DateRange, FieldFilter, FilterSet, filter_by_date_range, filter_by_field, filter_by_search,
};
pub use reconciler::{LoadStatus, RecordReconciler, SourceView};
pub use record::{
    LogicalField, OutcomeClass, PLACEHOLDER, ParseFieldError, RawRecord, SourceSummary,
    is_session_active, mask_token, parse_timestamp, stringify,
};
pub use source::{ALL, LogSource, ParseSourceError, WRAPPER_KEYS, extract_rows};
