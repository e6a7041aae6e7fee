//! Test utilities for Lambda handler testing.
//!
//! Provides a scripted [`LogQueryService`], a fixed clock and proxy event
//! builders so handler tests never touch AWS.
//!
//! # Usage
//!
//! These utilities are available in test builds, or to dependent crates through
//! the `test-utils` feature:
//!
//! ```ignore
//! use visitor_insights_lambda_shared::test_utils::{
//!     block_count_row, proxy_event, ScriptedLogQueryService,
//! };
//!
//! let service = ScriptedLogQueryService::new()
//!     .then_pending(QueryStatus::Running)
//!     .then_complete(vec![block_count_row("3")]);
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lambda_runtime::{Context, LambdaEvent};
use serde_json::Value;
use tokio::time::Instant;

use crate::query::{
    Clock, LogQueryService, QueryError, QueryHandle, QueryResults, QueryStatus, ResultField,
};
use crate::requests::ProxyRequest;

/// Query id issued by [`ScriptedLogQueryService`] unless overridden.
pub const SCRIPTED_QUERY_ID: &str = "11111111-2222-3333-4444-555555555555";

/// Arguments of one recorded `start_query` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartQueryCall {
    pub log_group: String,
    pub start: i64,
    pub end: i64,
    pub query: String,
}

/// [`LogQueryService`] that replays a fixed script of poll responses.
///
/// Once the script is exhausted every further poll reports `Running`, which
/// lets tests exercise the poll bound.
#[derive(Debug)]
pub struct ScriptedLogQueryService {
    start_result: Result<QueryHandle, QueryError>,
    polls: Mutex<VecDeque<Result<QueryResults, QueryError>>>,
    start_calls: Mutex<Vec<StartQueryCall>>,
    poll_instants: Mutex<Vec<Instant>>,
}

impl Default for ScriptedLogQueryService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLogQueryService {
    pub fn new() -> Self {
        Self {
            start_result: Ok(QueryHandle::new(SCRIPTED_QUERY_ID)),
            polls: Mutex::new(VecDeque::new()),
            start_calls: Mutex::new(Vec::new()),
            poll_instants: Mutex::new(Vec::new()),
        }
    }

    /// Make `start_query` fail with `error`.
    pub fn failing_start(mut self, error: QueryError) -> Self {
        self.start_result = Err(error);
        self
    }

    /// Queue a poll response.
    pub fn then(self, response: Result<QueryResults, QueryError>) -> Self {
        self.polls
            .lock()
            .expect("poll script lock poisoned")
            .push_back(response);
        self
    }

    /// Queue a non-terminal (or rowless terminal) status.
    pub fn then_pending(self, status: QueryStatus) -> Self {
        self.then(Ok(QueryResults::pending(status)))
    }

    /// Queue a `Complete` status with `rows`.
    pub fn then_complete(self, rows: Vec<Vec<ResultField>>) -> Self {
        self.then(Ok(QueryResults::complete(rows)))
    }

    /// Queue a polling failure.
    pub fn then_error(self, error: QueryError) -> Self {
        self.then(Err(error))
    }

    /// Recorded `start_query` calls.
    pub fn start_calls(&self) -> Vec<StartQueryCall> {
        self.start_calls
            .lock()
            .expect("start call lock poisoned")
            .clone()
    }

    /// Number of `get_query_results` calls made so far.
    pub fn poll_count(&self) -> usize {
        self.poll_instants().len()
    }

    /// Tokio instants at which each poll happened.
    pub fn poll_instants(&self) -> Vec<Instant> {
        self.poll_instants
            .lock()
            .expect("poll instant lock poisoned")
            .clone()
    }
}

#[async_trait]
impl LogQueryService for ScriptedLogQueryService {
    async fn start_query(
        &self,
        log_group: &str,
        start: i64,
        end: i64,
        query: &str,
    ) -> Result<QueryHandle, QueryError> {
        self.start_calls
            .lock()
            .expect("start call lock poisoned")
            .push(StartQueryCall {
                log_group: log_group.to_string(),
                start,
                end,
                query: query.to_string(),
            });
        self.start_result.clone()
    }

    async fn get_query_results(&self, handle: &QueryHandle) -> Result<QueryResults, QueryError> {
        assert_eq!(
            Some(handle),
            self.start_result.as_ref().ok(),
            "polled a handle that was never issued"
        );
        self.poll_instants
            .lock()
            .expect("poll instant lock poisoned")
            .push(Instant::now());
        self.polls
            .lock()
            .expect("poll script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResults::pending(QueryStatus::Running)))
    }
}

/// [`Clock`] that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2024-06-01T12:00:00Z.
    pub fn noon() -> Self {
        Self(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
                .single()
                .expect("valid fixed timestamp"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A single result row holding `blockCount = value`.
pub fn block_count_row(value: &str) -> Vec<ResultField> {
    vec![ResultField::new("blockCount", value)]
}

/// Wrap a proxy request into a Lambda event with a default context.
pub fn proxy_event(request: &ProxyRequest) -> LambdaEvent<Value> {
    let payload = serde_json::to_value(request).expect("proxy request serializes");
    LambdaEvent::new(payload, Context::default())
}

/// Create a mock request ID for testing.
///
/// Since `lambda_runtime::Context` is non-exhaustive and cannot be directly
/// constructed, tests should use the request ID directly for assertions.
pub fn mock_request_id(suffix: &str) -> String {
    format!("test-request-{}", suffix)
}
