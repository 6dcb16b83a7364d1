//! Raw feed records and alias-based field resolution.
//!
//! Feeds disagree on field names (`customer_name` vs `customerName`, ...).
//! Every logical field owns an ordered alias list in [`LogicalField::aliases`]
//! and all reads go through [`RawRecord::lookup`]; no call site probes keys
//! by hand.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Placeholder rendered when no alias of a field is present.
pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalField {
    CustomerName,
    Action,
    EntityType,
    EntityId,
    Details,
    IpAddress,
    Timestamp,
    OperationName,
    RequestType,
    Endpoint,
    ResponseCode,
    Duration,
    Status,
    SessionToken,
    UserAgent,
    LoginTime,
    LogoutTime,
    Title,
    Message,
    NotificationType,
}

impl LogicalField {
    /// Candidate keys, probed in order.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::CustomerName => &["customer_name", "customerName", "customer", "username"],
            Self::Action => &["action"],
            Self::EntityType => &["entity_type", "entityType"],
            Self::EntityId => &["entity_id", "entityId"],
            Self::Details => &["details", "description"],
            Self::IpAddress => &["ip_address", "ipAddress", "ip"],
            Self::Timestamp => &["timestamp", "created_at", "login_time", "createdAt"],
            Self::OperationName => &["operation_name", "operationName", "name", "operation"],
            Self::RequestType => &["request_type", "method", "requestType"],
            Self::Endpoint => &["endpoint", "url", "path"],
            Self::ResponseCode => &["response_code", "responseCode", "status_code", "statusCode"],
            Self::Duration => &["duration", "duration_ms"],
            Self::Status => &["status"],
            Self::SessionToken => &["session_token", "sessionToken", "token"],
            Self::UserAgent => &["user_agent", "userAgent"],
            Self::LoginTime => &["login_time", "loginTime", "login_at", "created_at"],
            Self::LogoutTime => &["logout_time", "logoutTime", "logout_at"],
            Self::Title => &["title"],
            Self::Message => &["message", "body"],
            Self::NotificationType => &["type"],
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CustomerName => "customerName",
            Self::Action => "action",
            Self::EntityType => "entityType",
            Self::EntityId => "entityId",
            Self::Details => "details",
            Self::IpAddress => "ipAddress",
            Self::Timestamp => "timestamp",
            Self::OperationName => "operationName",
            Self::RequestType => "requestType",
            Self::Endpoint => "endpoint",
            Self::ResponseCode => "responseCode",
            Self::Duration => "duration",
            Self::Status => "status",
            Self::SessionToken => "sessionToken",
            Self::UserAgent => "userAgent",
            Self::LoginTime => "loginTime",
            Self::LogoutTime => "logoutTime",
            Self::Title => "title",
            Self::Message => "message",
            Self::NotificationType => "type",
        }
    }

    /// Column heading for tabular output.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::CustomerName => "Customer",
            Self::Action => "Action",
            Self::EntityType => "Entity Type",
            Self::EntityId => "Entity ID",
            Self::Details => "Details",
            Self::IpAddress => "IP Address",
            Self::Timestamp => "Timestamp",
            Self::OperationName => "Operation",
            Self::RequestType => "Method",
            Self::Endpoint => "Endpoint",
            Self::ResponseCode => "Response Code",
            Self::Duration => "Duration",
            Self::Status => "Status",
            Self::SessionToken => "Session Token",
            Self::UserAgent => "User Agent",
            Self::LoginTime => "Login Time",
            Self::LogoutTime => "Logout Time",
            Self::Title => "Title",
            Self::Message => "Message",
            Self::NotificationType => "Type",
        }
    }

    const VARIANTS: [LogicalField; 20] = [
        Self::CustomerName,
        Self::Action,
        Self::EntityType,
        Self::EntityId,
        Self::Details,
        Self::IpAddress,
        Self::Timestamp,
        Self::OperationName,
        Self::RequestType,
        Self::Endpoint,
        Self::ResponseCode,
        Self::Duration,
        Self::Status,
        Self::SessionToken,
        Self::UserAgent,
        Self::LoginTime,
        Self::LogoutTime,
        Self::Title,
        Self::Message,
        Self::NotificationType,
    ];
}

impl std::fmt::Display for LogicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown logical field '{0}'")]
pub struct ParseFieldError(pub String);

impl FromStr for LogicalField {
    type Err = ParseFieldError;

    /// Accepts the logical name or any of its aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::VARIANTS
            .into_iter()
            .find(|field| {
                field.name().eq_ignore_ascii_case(wanted)
                    || field.aliases().iter().any(|a| a.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| ParseFieldError(s.to_string()))
    }
}

/// One untyped row from a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON object; any other value is rejected.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    /// First non-null value among `field`'s aliases.
    #[must_use]
    pub fn lookup(&self, field: LogicalField) -> Option<&Value> {
        field
            .aliases()
            .iter()
            .find_map(|alias| self.0.get(*alias).filter(|v| !v.is_null()))
    }

    /// Display form of `field`, or [`PLACEHOLDER`] when no alias is present.
    #[must_use]
    pub fn resolve(&self, field: LogicalField) -> String {
        self.lookup(field)
            .map_or_else(|| PLACEHOLDER.to_string(), stringify)
    }

    /// Resolved value as text, empty when absent (used for comparisons).
    #[must_use]
    pub fn resolve_text(&self, field: LogicalField) -> String {
        self.lookup(field).map(stringify).unwrap_or_default()
    }

    /// Timestamp used for date filtering; `None` when absent or unparseable.
    ///
    /// Blank strings fall through to the next alias.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        LogicalField::Timestamp
            .aliases()
            .iter()
            .filter_map(|alias| self.0.get(*alias))
            .find(|value| match value {
                Value::Null => false,
                Value::String(text) => !text.trim().is_empty(),
                _ => true,
            })
            .and_then(parse_timestamp)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Text form of a JSON value: strings unquoted, scalars via `Display`,
/// arrays and objects as compact JSON.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Parse a feed timestamp. Zone-less forms are taken as UTC; numbers are epoch milliseconds.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp_str(text),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Mask a session token for display: `--` when absent, `****` when short,
/// otherwise the first and last four characters around `****`.
#[must_use]
pub fn mask_token(token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return PLACEHOLDER.to_string();
    };
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// Coarse outcome of a record's status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeClass {
    Success,
    Failure,
    Other,
}

impl OutcomeClass {
    #[must_use]
    pub fn classify(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" | "passed" | "pass" => Self::Success,
            "failure" | "failed" | "fail" | "error" => Self::Failure,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn of(record: &RawRecord) -> Self {
        Self::classify(&record.resolve_text(LogicalField::Status))
    }
}

/// Whether a session row describes a live session.
#[must_use]
pub fn is_session_active(record: &RawRecord) -> bool {
    let flag = |key: &str| record.get(key);
    matches!(flag("is_active"), Some(Value::Bool(true)))
        || flag("is_active").and_then(Value::as_i64) == Some(1)
        || matches!(flag("isActive"), Some(Value::Bool(true)))
        || matches!(flag("active"), Some(Value::Bool(true)))
        || flag("status").and_then(Value::as_str) == Some("active")
}

/// Outcome counts over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SourceSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RawRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut summary, record| {
                summary.total += 1;
                match OutcomeClass::of(record) {
                    OutcomeClass::Success => summary.succeeded += 1,
                    OutcomeClass::Failure => summary.failed += 1,
                    OutcomeClass::Other => {}
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn resolves_first_alias_present() {
        let row = record(json!({"customer_name": "Rahul"}));
        assert_eq!(row.resolve(LogicalField::CustomerName), "Rahul");
        assert_eq!(record(json!({})).resolve(LogicalField::CustomerName), PLACEHOLDER);
    }

    #[test]
    fn alias_order_is_respected_and_nulls_skipped() {
        let row = record(json!({
            "customer_name": null,
            "customer": "Priya",
            "username": "priya01",
        }));
        assert_eq!(row.resolve(LogicalField::CustomerName), "Priya");
        let both = record(json!({"customerName": "B", "customer_name": "A"}));
        assert_eq!(both.resolve(LogicalField::CustomerName), "A");
    }

    #[test]
    fn numbers_and_bools_stringify() {
        let row = record(json!({"response_code": 201, "is_active": true}));
        assert_eq!(row.resolve(LogicalField::ResponseCode), "201");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn parses_supported_timestamp_shapes() {
        let expected = DateTime::parse_from_rfc3339("2026-02-01T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        for value in [
            json!("2026-02-01T10:30:00Z"),
            json!("2026-02-01T16:00:00+05:30"),
            json!("2026-02-01 10:30:00"),
            json!("2026-02-01T10:30:00.000"),
            json!(expected.timestamp_millis()),
        ] {
            assert_eq!(parse_timestamp(&value), Some(expected), "{value}");
        }
        assert!(parse_timestamp(&json!("2026-02-01")).is_some());
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn timestamp_uses_alias_chain() {
        let row = record(json!({"login_time": "2026-03-04 08:00:00"}));
        assert!(row.timestamp().is_some());
        let garbage = record(json!({"timestamp": "not a date"}));
        assert_eq!(garbage.timestamp(), None);
    }

    #[test]
    fn blank_timestamp_falls_through_to_created_at() {
        let row = record(json!({"timestamp": "  ", "created_at": "2026-01-31 10:00:00"}));
        assert_eq!(
            row.timestamp().map(|ts| ts.date_naive()),
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
        let blank = record(json!({"timestamp": ""}));
        assert_eq!(blank.timestamp(), None);
    }

    #[test]
    fn masks_tokens() {
        assert_eq!(mask_token(None), "--");
        assert_eq!(mask_token(Some("abc")), "****");
        assert_eq!(mask_token(Some("abcd1234wxyz")), "abcd****wxyz");
    }

    #[test]
    fn classifies_outcomes() {
        assert_eq!(OutcomeClass::classify("PASSED"), OutcomeClass::Success);
        assert_eq!(OutcomeClass::classify("error"), OutcomeClass::Failure);
        assert_eq!(OutcomeClass::classify("pending"), OutcomeClass::Other);
        let rows = [
            record(json!({"status": "success"})),
            record(json!({"status": "failure"})),
            record(json!({"status": "pending"})),
            record(json!({})),
        ];
        let summary = SourceSummary::from_records(&rows);
        assert_eq!(
            summary,
            SourceSummary {
                total: 4,
                succeeded: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn detects_active_sessions() {
        assert!(is_session_active(&record(json!({"is_active": 1}))));
        assert!(is_session_active(&record(json!({"isActive": true}))));
        assert!(is_session_active(&record(json!({"status": "active"}))));
        assert!(!is_session_active(&record(json!({"is_active": 0}))));
    }

    #[test]
    fn fields_parse_from_names_and_aliases() {
        assert_eq!("customerName".parse(), Ok(LogicalField::CustomerName));
        assert_eq!("customer_name".parse(), Ok(LogicalField::CustomerName));
        assert_eq!("type".parse(), Ok(LogicalField::NotificationType));
        assert!("balance".parse::<LogicalField>().is_err());
    }
}
