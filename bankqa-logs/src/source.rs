//! The four log/audit feeds and how their response bodies are unwrapped.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::record::{LogicalField, RawRecord};

/// Wrapper keys probed, in order, when a body is an object rather than an array.
pub const WRAPPER_KEYS: [&str; 5] = ["operations", "flows", "sessions", "notifications", "data"];

/// Wildcard value for categorical filters.
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Audit,
    Operation,
    Session,
    Notification,
}

impl LogSource {
    pub const VARIANTS: [LogSource; 4] = [
        LogSource::Audit,
        LogSource::Operation,
        LogSource::Session,
        LogSource::Notification,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::Operation => "operation",
            Self::Session => "session",
            Self::Notification => "notification",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Audit => "Audit Log",
            Self::Operation => "Operation Log",
            Self::Session => "Session Log",
            Self::Notification => "Notifications",
        }
    }

    /// Path on the backend, relative to the API base URL.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Audit => "/api/audit-log",
            Self::Operation => "/api/operation-flow",
            Self::Session => "/api/sessions",
            Self::Notification => "/api/notifications",
        }
    }

    /// Field the categorical filter applies to, if this feed has one.
    #[must_use]
    pub const fn category_field(self) -> Option<LogicalField> {
        match self {
            Self::Audit => Some(LogicalField::Action),
            Self::Operation => Some(LogicalField::Status),
            Self::Notification => Some(LogicalField::NotificationType),
            Self::Session => None,
        }
    }

    /// Choices offered for the categorical filter, led by the wildcard.
    #[must_use]
    pub const fn category_options(self) -> &'static [&'static str] {
        match self {
            Self::Audit => &[
                ALL, "CREATE", "UPDATE", "DELETE", "LOGIN", "LOGOUT", "VIEW", "TRANSFER", "PAYMENT",
            ],
            Self::Operation => &[ALL, "success", "failure", "error", "pending"],
            Self::Notification => &[
                ALL, "info", "warning", "error", "success", "alert", "reminder",
            ],
            Self::Session => &[ALL],
        }
    }

    /// Logical columns shown for this feed, in display order.
    #[must_use]
    pub const fn columns(self) -> &'static [LogicalField] {
        match self {
            Self::Audit => &[
                LogicalField::CustomerName,
                LogicalField::Action,
                LogicalField::EntityType,
                LogicalField::EntityId,
                LogicalField::Details,
                LogicalField::IpAddress,
                LogicalField::Timestamp,
            ],
            Self::Operation => &[
                LogicalField::OperationName,
                LogicalField::RequestType,
                LogicalField::Endpoint,
                LogicalField::ResponseCode,
                LogicalField::Duration,
                LogicalField::Status,
                LogicalField::Timestamp,
            ],
            Self::Session => &[
                LogicalField::CustomerName,
                LogicalField::SessionToken,
                LogicalField::IpAddress,
                LogicalField::UserAgent,
                LogicalField::LoginTime,
                LogicalField::LogoutTime,
            ],
            Self::Notification => &[
                LogicalField::CustomerName,
                LogicalField::Title,
                LogicalField::Message,
                LogicalField::NotificationType,
                LogicalField::Timestamp,
            ],
        }
    }
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log source '{0}' (expected audit, operation, session or notification)")]
pub struct ParseSourceError(pub String);

impl FromStr for LogSource {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audit" | "audit-log" => Ok(Self::Audit),
            "operation" | "operations" | "operation-flow" => Ok(Self::Operation),
            "session" | "sessions" => Ok(Self::Session),
            "notification" | "notifications" => Ok(Self::Notification),
            _ => Err(ParseSourceError(s.to_string())),
        }
    }
}

/// Pull the record list out of a response body.
///
/// A bare array is used as-is. An object is probed for [`WRAPPER_KEYS`] in
/// order; the first non-null key wins even if its value is empty. Anything
/// else yields no rows. Array entries that are not JSON objects are dropped.
#[must_use]
pub fn extract_rows(body: Value) -> Vec<RawRecord> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut map) => {
            let winner = WRAPPER_KEYS
                .iter()
                .find_map(|key| map.remove(*key).filter(|v| !v.is_null()));
            match winner {
                Some(Value::Array(rows)) => rows,
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    let total = rows.len();
    let records: Vec<RawRecord> = rows.into_iter().filter_map(RawRecord::from_value).collect();
    if records.len() < total {
        log::warn!(
            "dropped {} non-object rows from response",
            total - records.len()
        );
    }
    records
}
