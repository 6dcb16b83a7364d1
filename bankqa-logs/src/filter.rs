//! Pure record filters and the fixed search → date → field pipeline.
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::record::{LogicalField, RawRecord, stringify};

/// Keep records where any value's text contains `query`, ignoring case.
///
/// A blank query keeps everything.
pub fn filter_by_search<'a>(
    records: impl IntoIterator<Item = &'a RawRecord>,
    query: &str,
) -> Vec<&'a RawRecord> {
    let needle = search_needle(query);
    records
        .into_iter()
        .filter(|record| matches_search(record, needle.as_deref()))
        .collect()
}

/// Keep records whose timestamp falls inside `range`. Undated records pass.
pub fn filter_by_date_range<'a>(
    records: impl IntoIterator<Item = &'a RawRecord>,
    range: &DateRange,
) -> Vec<&'a RawRecord> {
    records
        .into_iter()
        .filter(|record| range.admits(record))
        .collect()
}

/// Keep records whose resolved `field` equals `expected`, ignoring case.
///
/// Wildcard values (`All`, `*`, blank) keep everything.
pub fn filter_by_field<'a>(
    records: impl IntoIterator<Item = &'a RawRecord>,
    field: LogicalField,
    expected: &str,
) -> Vec<&'a RawRecord> {
    let filter = FieldFilter::new(field, expected);
    records
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect()
}

/// Lowercased query, or `None` when it is blank. Surrounding spaces are kept.
fn search_needle(query: &str) -> Option<String> {
    (!query.trim().is_empty()).then(|| query.to_lowercase())
}

fn matches_search(record: &RawRecord, needle: Option<&str>) -> bool {
    needle.is_none_or(|needle| {
        record
            .values()
            .filter(|value| !value.is_null())
            .any(|value| stringify(value).to_lowercase().contains(needle))
    })
}

/// Inclusive calendar-day bounds, evaluated in UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    #[must_use]
    pub const fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Build from operator text (`YYYY-MM-DD`). Unparseable input means no bound.
    #[must_use]
    pub fn from_inputs(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: from.and_then(parse_bound),
            to: to.and_then(parse_bound),
        }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether `instant` lies between start of `from` and the last millisecond of `to`.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let after_start = self
            .from
            .is_none_or(|from| instant >= from.and_time(NaiveTime::MIN).and_utc());
        let before_end = self.to.is_none_or(|to| {
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
                .is_none_or(|end| instant <= to.and_time(end).and_utc())
        });
        after_start && before_end
    }

    #[must_use]
    pub fn admits(&self, record: &RawRecord) -> bool {
        if self.is_unbounded() {
            return true;
        }
        record.timestamp().is_none_or(|ts| self.contains(ts))
    }
}

fn parse_bound(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            log::warn!("ignoring date bound '{text}': {err}");
            None
        }
    }
}

/// Case-insensitive equality on one resolved field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: LogicalField,
    pub expected: String,
}

impl FieldFilter {
    pub fn new(field: LogicalField, expected: impl Into<String>) -> Self {
        Self {
            field,
            expected: expected.into(),
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        let value = self.expected.trim();
        value.is_empty() || value == "*" || value.eq_ignore_ascii_case(crate::source::ALL)
    }

    /// Absent fields compare as empty text.
    #[must_use]
    pub fn matches(&self, record: &RawRecord) -> bool {
        self.is_wildcard()
            || record
                .resolve_text(self.field)
                .eq_ignore_ascii_case(self.expected.trim())
    }
}

/// All three filters, applied as search, then date range, then field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub search: String,
    pub date_range: DateRange,
    pub field: Option<FieldFilter>,
}

impl FilterSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.date_range.is_unbounded()
            && self.field.as_ref().is_none_or(FieldFilter::is_wildcard)
    }

    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a RawRecord>) -> Vec<&'a RawRecord> {
        let searched = filter_by_search(records, &self.search);
        let dated = filter_by_date_range(searched, &self.date_range);
        match &self.field {
            Some(filter) => filter_by_field(dated, filter.field, &filter.expected),
            None => dated,
        }
    }

    /// The conjunction of every predicate for a single record.
    #[must_use]
    pub fn matches(&self, record: &RawRecord) -> bool {
        matches_search(record, search_needle(&self.search).as_deref())
            && self.date_range.admits(record)
            && self.field.as_ref().is_none_or(|f| f.matches(record))
    }
}
