//! Log analytics query abstraction.
//!
//! [`LogQueryService`] is the seam between the handler and CloudWatch Logs
//! Insights. The production implementation lives in [`crate::cloudwatch`]; tests
//! substitute a scripted service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Opaque identifier of one in-flight analytics query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state reported for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
    /// A status string this crate does not recognize.
    Other(String),
}

impl QueryStatus {
    /// Map the service's status string onto a variant.
    pub fn parse(s: &str) -> Self {
        match s {
            "Scheduled" => Self::Scheduled,
            "Running" => Self::Running,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Timeout" => Self::Timeout,
            "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only `Scheduled` and `Running` can still change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled | Self::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
            Self::Unknown => "Unknown",
            Self::Other(other) => other,
        }
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `field`/`value` cell of a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultField {
    pub field: String,
    pub value: String,
}

impl ResultField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Snapshot returned by a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResults {
    pub status: QueryStatus,
    pub rows: Vec<Vec<ResultField>>,
}

impl QueryResults {
    /// A snapshot without rows, as returned while a query is pending.
    pub fn pending(status: QueryStatus) -> Self {
        Self {
            status,
            rows: Vec::new(),
        }
    }

    /// A completed snapshot with the given rows.
    pub fn complete(rows: Vec<Vec<ResultField>>) -> Self {
        Self {
            status: QueryStatus::Complete,
            rows,
        }
    }

    /// Value of `field` in the first row.
    ///
    /// `None` when there are no rows or the first row lacks the field.
    pub fn first_row_value(&self, field: &str) -> Option<&str> {
        self.rows
            .first()?
            .iter()
            .find(|cell| cell.field == field)
            .map(|cell| cell.value.as_str())
    }
}

/// Failures talking to the log query service.
///
/// Messages are safe to return to clients: they never carry the query id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Submitting the query failed.
    #[error("failed to start query: {0}")]
    StartQuery(String),

    /// The service accepted the query but returned no identifier.
    #[error("query service returned no query id")]
    MissingQueryId,

    /// Fetching query status or results failed.
    #[error("failed to fetch query results: {0}")]
    GetQueryResults(String),

    /// A result value that should have been a count was not one.
    #[error("query returned a non-numeric count: {0}")]
    InvalidCount(String),
}

/// Asynchronous analytics query service.
#[async_trait]
pub trait LogQueryService: Send + Sync {
    /// Submit `query` over `[start, end]` (epoch seconds) against `log_group`.
    async fn start_query(
        &self,
        log_group: &str,
        start: i64,
        end: i64,
        query: &str,
    ) -> Result<QueryHandle, QueryError>;

    /// Fetch the current status, and rows once available, of a query.
    async fn get_query_results(&self, handle: &QueryHandle) -> Result<QueryResults, QueryError>;
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_known_values() {
        for raw in [
            "Scheduled",
            "Running",
            "Complete",
            "Failed",
            "Cancelled",
            "Timeout",
            "Unknown",
        ] {
            assert_eq!(QueryStatus::parse(raw).as_str(), raw);
        }
        assert_eq!(
            QueryStatus::parse("Paused"),
            QueryStatus::Other("Paused".to_string())
        );
    }

    #[test]
    fn test_only_scheduled_and_running_are_pending() {
        assert!(!QueryStatus::Scheduled.is_terminal());
        assert!(!QueryStatus::Running.is_terminal());
        assert!(QueryStatus::Complete.is_terminal());
        assert!(QueryStatus::Failed.is_terminal());
        assert!(QueryStatus::Other("Paused".into()).is_terminal());
    }

    #[test]
    fn test_first_row_value() {
        let results = QueryResults::complete(vec![
            vec![ResultField::new("other", "1"), ResultField::new("blockCount", "7")],
            vec![ResultField::new("blockCount", "9")],
        ]);
        assert_eq!(results.first_row_value("blockCount"), Some("7"));
        assert_eq!(results.first_row_value("missing"), None);
        assert_eq!(QueryResults::complete(vec![]).first_row_value("blockCount"), None);
    }

    #[test]
    fn test_error_messages_omit_query_id() {
        let err = QueryError::GetQueryResults("throttled".to_string());
        assert_eq!(err.to_string(), "failed to fetch query results: throttled");
    }
}
