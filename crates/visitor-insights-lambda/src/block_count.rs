//! WAF blocked-request count over the trailing hour.
//!
//! Runs a CloudWatch Logs Insights query against the WAF log group and waits
//! for it to finish:
//!
//! ```text
//! unconfigured ──► error
//! submit ──► sleep ─► poll ─┬─ Scheduled/Running ─► sleep ─► poll ...
//!                           ├─ Complete ─► count from first row (0 if absent)
//!                           ├─ other terminal ─► error
//!                           └─ attempts exhausted ─► error
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use visitor_insights_lambda_shared::{
    Clock, ErrorBody, LambdaRuntime, LogQueryService, PollPolicy, ProxyResponse, QueryError,
    QueryResults, QueryStatus,
};

/// Name of the aggregate produced by [`BLOCK_COUNT_QUERY`].
pub const BLOCK_COUNT_FIELD: &str = "blockCount";

/// Logs Insights query counting requests the WAF blocked.
pub const BLOCK_COUNT_QUERY: &str = "fields @timestamp, httpRequest.clientIp, action
| filter action = 'BLOCK'
| stats count(*) as blockCount";

/// Length of the trailing window counted, in minutes.
pub const QUERY_WINDOW_MINUTES: i64 = 60;

/// Body of a successful `waf` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCountResult {
    pub block_count: u64,
}

/// Time range a query covers, in epoch seconds. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: i64,
    pub end: i64,
}

impl QueryWindow {
    /// The `QUERY_WINDOW_MINUTES` ending at `now`.
    pub fn trailing_hour(now: DateTime<Utc>) -> Self {
        let start = now - Duration::minutes(QUERY_WINDOW_MINUTES);
        Self {
            start: start.timestamp(),
            end: now.timestamp(),
        }
    }
}

/// Ways the `waf` action can fail. All map to a 500 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockCountError {
    /// No WAF log group configured; nothing was sent to the service.
    #[error("WAF log source not configured.")]
    NotConfigured,

    /// Submitting or polling the query failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The query reached a terminal state other than `Complete`.
    #[error("query finished with status {status}")]
    Incomplete { status: QueryStatus },

    /// The query was still pending when the poll budget ran out.
    #[error("query still pending after {attempts} status checks")]
    Timeout { attempts: u32 },
}

impl BlockCountError {
    /// Client-facing error body.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::NotConfigured => ErrorBody::new(self.to_string()),
            Self::Query(e) => ErrorBody::new("Failed to query WAF logs.").with_details(e.to_string()),
            Self::Incomplete { .. } => {
                ErrorBody::new("WAF log query did not complete.").with_details(self.to_string())
            }
            Self::Timeout { .. } => {
                ErrorBody::new("WAF log query timed out.").with_details(self.to_string())
            }
        }
    }
}

/// One execution of the block-count query against injected dependencies.
pub struct BlockCountQuery<'a> {
    service: &'a dyn LogQueryService,
    clock: &'a dyn Clock,
    log_group: Option<&'a str>,
    poll: PollPolicy,
}

impl<'a> BlockCountQuery<'a> {
    pub fn new(
        service: &'a dyn LogQueryService,
        clock: &'a dyn Clock,
        log_group: Option<&'a str>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            service,
            clock,
            log_group,
            poll,
        }
    }

    /// Wire the query to the runtime's service, clock and configuration.
    pub fn from_runtime(runtime: &'a LambdaRuntime) -> Self {
        Self::new(
            runtime.log_queries(),
            runtime.clock(),
            runtime.config().waf_log_group(),
            runtime.config().poll,
        )
    }

    /// Submit the query, wait for it to finish and return the count.
    pub async fn run(&self) -> Result<u64, BlockCountError> {
        let log_group = self
            .log_group
            .filter(|group| !group.trim().is_empty())
            .ok_or(BlockCountError::NotConfigured)?;

        let window = QueryWindow::trailing_hour(self.clock.now());
        debug!(
            log_group,
            start = window.start,
            end = window.end,
            "starting WAF block count query"
        );

        let handle = self
            .service
            .start_query(log_group, window.start, window.end, BLOCK_COUNT_QUERY)
            .await?;
        info!(query_id = %handle, "WAF block count query started");

        let mut attempts = 0;
        while attempts < self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;
            attempts += 1;

            let results = self.service.get_query_results(&handle).await?;
            debug!(query_id = %handle, poll = attempts, status = %results.status, "polled query");

            if results.status.is_terminal() {
                return extract_block_count(results);
            }
        }

        Err(BlockCountError::Timeout { attempts })
    }
}

/// Pull the count out of a terminal query snapshot.
///
/// A `Complete` query with no rows, or whose first row lacks the count field,
/// counts as zero.
pub fn extract_block_count(results: QueryResults) -> Result<u64, BlockCountError> {
    if results.status != QueryStatus::Complete {
        return Err(BlockCountError::Incomplete {
            status: results.status,
        });
    }

    match results.first_row_value(BLOCK_COUNT_FIELD) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| QueryError::InvalidCount(value.to_string()).into()),
        None => {
            if !results.rows.is_empty() {
                warn!("first result row has no {} field", BLOCK_COUNT_FIELD);
            }
            Ok(0)
        }
    }
}

/// Handle the `waf` action.
pub async fn waf_block_count(runtime: &LambdaRuntime) -> ProxyResponse {
    match BlockCountQuery::from_runtime(runtime).run().await {
        Ok(block_count) => {
            info!(block_count, "WAF block count computed");
            ProxyResponse::ok(&BlockCountResult { block_count })
        }
        Err(e) => {
            error!(error = %e, "WAF block count failed");
            ProxyResponse::internal_error(&e.to_body())
        }
    }
}
