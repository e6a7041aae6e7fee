//! CloudWatch Logs Insights implementation of [`LogQueryService`].

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatchlogs::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatchlogs::Client;
use tracing::debug;

use crate::query::{
    LogQueryService, QueryError, QueryHandle, QueryResults, QueryStatus, ResultField,
};

/// Log query service backed by the AWS SDK CloudWatch Logs client.
#[derive(Debug, Clone)]
pub struct CloudWatchLogsService {
    client: Client,
}

impl CloudWatchLogsService {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client bound to `region` using the default credential chain.
    pub async fn for_region(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl LogQueryService for CloudWatchLogsService {
    async fn start_query(
        &self,
        log_group: &str,
        start: i64,
        end: i64,
        query: &str,
    ) -> Result<QueryHandle, QueryError> {
        let output = self
            .client
            .start_query()
            .log_group_name(log_group)
            .start_time(start)
            .end_time(end)
            .query_string(query)
            .send()
            .await
            .map_err(|e| QueryError::StartQuery(describe(&e)))?;

        output
            .query_id()
            .filter(|id| !id.is_empty())
            .map(QueryHandle::new)
            .ok_or(QueryError::MissingQueryId)
    }

    async fn get_query_results(&self, handle: &QueryHandle) -> Result<QueryResults, QueryError> {
        let output = self
            .client
            .get_query_results()
            .query_id(handle.as_str())
            .send()
            .await
            .map_err(|e| QueryError::GetQueryResults(describe(&e)))?;

        let status = output
            .status()
            .map(|s| QueryStatus::parse(s.as_str()))
            .unwrap_or(QueryStatus::Unknown);

        let rows = output
            .results()
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|cell| {
                        Some(ResultField::new(cell.field()?, cell.value().unwrap_or_default()))
                    })
                    .collect()
            })
            .collect();

        debug!(status = %status, "fetched query results");

        Ok(QueryResults { status, rows })
    }
}

/// Client-safe description of an SDK failure.
///
/// Prefers the service error code and message over the full error chain, which
/// can carry request identifiers.
fn describe<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata,
    SdkError<E, R>: std::fmt::Display,
{
    match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code.to_string(),
        _ => err.to_string(),
    }
}
